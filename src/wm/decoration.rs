//! Decoration Module
//!
//! Flat border/frame descriptions for client frames, and the colour
//! schemes selected by a client's outside state.

use serde::{Deserialize, Serialize};

use crate::wm::client::OutsideState;
use crate::wm::geometry::Extents;

/// Border and frame description applied around a client window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decoration {
    /// Border width in pixels (drawn by the server around the frame)
    pub border: Option<i32>,
    /// Frame padding between border and client window
    pub frame: Option<Extents>,
}

impl Decoration {
    pub const NO_DECORATION: Decoration = Decoration {
        border: None,
        frame: None,
    };

    pub const BORDER_DECORATION: Decoration = Decoration {
        border: Some(1),
        frame: None,
    };

    pub const FREE_DECORATION: Decoration = Decoration {
        border: Some(1),
        frame: Some(Extents {
            left: 0,
            right: 0,
            top: 3,
            bottom: 0,
        }),
    };

    pub fn border_width(&self) -> i32 {
        self.border.unwrap_or(0)
    }

    /// Total space taken on each side of the client window
    pub fn extents(&self) -> Extents {
        let border = Extents::uniform(self.border_width());

        match self.frame {
            Some(frame) => border + frame,
            None => border,
        }
    }
}

/// One colour per outside state (0xRRGGBB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub focused: u32,
    pub focused_disowned: u32,
    pub focused_sticky: u32,
    pub unfocused: u32,
    pub unfocused_disowned: u32,
    pub unfocused_sticky: u32,
    pub urgent: u32,
}

impl ColorScheme {
    pub const DEFAULT_BORDER: ColorScheme = ColorScheme {
        focused: 0x8181a6,
        focused_disowned: 0xc1c1c1,
        focused_sticky: 0x5f8787,
        unfocused: 0x333333,
        unfocused_disowned: 0x999999,
        unfocused_sticky: 0x444444,
        urgent: 0x87875f,
    };

    pub const DEFAULT_FRAME: ColorScheme = ColorScheme {
        focused: 0x5e81ac,
        focused_disowned: 0x4c566a,
        focused_sticky: 0x8fbcbb,
        unfocused: 0x2e3440,
        unfocused_disowned: 0x3b4252,
        unfocused_sticky: 0x434c5e,
        urgent: 0xbf616a,
    };

    pub fn color(&self, state: OutsideState) -> u32 {
        match state {
            OutsideState::Focused => self.focused,
            OutsideState::FocusedDisowned => self.focused_disowned,
            OutsideState::FocusedSticky => self.focused_sticky,
            OutsideState::Unfocused => self.unfocused,
            OutsideState::UnfocusedDisowned => self.unfocused_disowned,
            OutsideState::UnfocusedSticky => self.unfocused_sticky,
            OutsideState::Urgent => self.urgent,
        }
    }
}

/// Border and frame colour schemes in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub border: ColorScheme,
    pub frame: ColorScheme,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            border: ColorScheme::DEFAULT_BORDER,
            frame: ColorScheme::DEFAULT_FRAME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoration_extents() {
        assert_eq!(Decoration::NO_DECORATION.extents(), Extents::default());
        assert_eq!(Decoration::BORDER_DECORATION.extents(), Extents::uniform(1));
        assert_eq!(
            Decoration::FREE_DECORATION.extents(),
            Extents {
                left: 1,
                right: 1,
                top: 4,
                bottom: 1,
            }
        );
    }

    #[test]
    fn test_color_by_state() {
        let scheme = ColorScheme::DEFAULT_BORDER;
        assert_eq!(scheme.color(OutsideState::Urgent), scheme.urgent);
        assert_eq!(scheme.color(OutsideState::UnfocusedSticky), scheme.unfocused_sticky);
    }
}
