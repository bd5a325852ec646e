//! Client Flags
//!
//! Bitfield flags for client state, plus the EWMH/ICCCM window type and
//! state vocabularies shared between the model and the display adapter.

use bitflags::bitflags;

bitflags! {
    /// Per-client state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientFlags: u32 {
        const FOCUSED     = 1 << 0;
        const MAPPED      = 1 << 1;
        const MANAGED     = 1 << 2;
        const URGENT      = 1 << 3;
        const FLOATING    = 1 << 4;
        const FULLSCREEN  = 1 << 5;
        const CONTAINED   = 1 << 6;
        const INVINCIBLE  = 1 << 7;
        const STICKY      = 1 << 8;
        const ICONIFYABLE = 1 << 9;
        const ICONIFIED   = 1 << 10;
        const DISOWNED    = 1 << 11;
        const PRODUCING   = 1 << 12;
    }
}

impl ClientFlags {
    /// Flags every freshly managed client starts with
    pub fn initial() -> Self {
        Self::MANAGED | Self::ICONIFYABLE | Self::PRODUCING
    }
}

/// Requested change of a boolean property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
    Reverse,
}

impl Toggle {
    /// The value the property should have, given its current value
    pub fn eval(self, current: bool) -> bool {
        match self {
            Toggle::On => true,
            Toggle::Off => false,
            Toggle::Reverse => !current,
        }
    }
}

impl From<bool> for Toggle {
    fn from(on: bool) -> Self {
        if on { Toggle::On } else { Toggle::Off }
    }
}

/// Window type (EWMH _NET_WM_WINDOW_TYPE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notification,
    Combo,
    Dnd,
    #[default]
    Normal,
}

/// Window state (EWMH _NET_WM_STATE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowState {
    Modal,
    Sticky,
    MaximizedVert,
    MaximizedHorz,
    Shaded,
    SkipTaskbar,
    SkipPager,
    Hidden,
    Fullscreen,
    Above,
    Below,
    DemandsAttention,
}

/// ICCCM WM_STATE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcccmWindowState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

/// What a client asked for in a _NET_WM_STATE message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Remove,
    Add,
    Toggle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_eval() {
        assert!(Toggle::On.eval(false));
        assert!(!Toggle::Off.eval(true));
        assert!(Toggle::Reverse.eval(false));
        assert!(!Toggle::Reverse.eval(true));
    }

    #[test]
    fn test_initial_flags() {
        let flags = ClientFlags::initial();
        assert!(flags.contains(ClientFlags::MANAGED));
        assert!(!flags.contains(ClientFlags::FOCUSED));
    }
}
