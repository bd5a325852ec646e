//! Placement Module
//!
//! The per-client result of an arrangement pass, and the initial free
//! region given to a newly managed window.

use crate::wm::client::Client;
use crate::wm::decoration::Decoration;
use crate::wm::geometry::{Dim, Region, Window};
use crate::wm::hints::SizeHints;

/// How a placement positions its client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMethod {
    /// By the client's own free region
    Free,
    /// By a region computed by the layout
    Tile,
}

/// Computed assignment for one client for one arrangement pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub method: PlacementMethod,
    pub window: Window,
    pub decoration: Decoration,
    /// `None` means the client is not shown this round
    pub region: Option<Region>,
}

impl Placement {
    pub fn new(
        method: PlacementMethod,
        window: Window,
        decoration: Decoration,
        region: Option<Region>,
    ) -> Self {
        Self {
            method,
            window,
            decoration,
            region,
        }
    }
}

/// Outer free region for a window that is about to be managed
///
/// `geometry` is the window's own inner geometry. Windows the program placed
/// at the origin without the user asking, or that a rule asks to center,
/// are centered on `screen`.
pub fn initial_free_region(
    geometry: Region,
    size_hints: Option<&SizeHints>,
    center: bool,
    screen: Region,
) -> Region {
    let mut dim = geometry.dim;

    match size_hints {
        Some(size_hints) => size_hints.apply(&mut dim),
        None => {
            dim.w = dim.w.max(Client::MIN_CLIENT_DIM.w);
            dim.h = dim.h.max(Client::MIN_CLIENT_DIM.h);
        }
    }

    let region = Region {
        pos: geometry.pos,
        dim,
    }
    .with_extents(Decoration::FREE_DECORATION.extents());

    let by_user = size_hints.is_some_and(|size_hints| size_hints.by_user);

    if center || (!by_user && geometry.pos.is_origin()) {
        return screen.center_of(region.dim);
    }

    region
}

/// Clamp a requested inner dimension to the size hints and the minimum size
pub fn constrain_dim(dim: Dim, size_hints: Option<&SizeHints>) -> Dim {
    let mut dim = dim;

    if let Some(size_hints) = size_hints {
        size_hints.apply(&mut dim);
    }

    Dim {
        w: dim.w.max(Client::MIN_CLIENT_DIM.w),
        h: dim.h.max(Client::MIN_CLIENT_DIM.h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_windows_are_centered() {
        let screen = Region::new(0, 0, 1000, 800);
        let region = initial_free_region(Region::new(0, 0, 198, 95), None, false, screen);
        assert_eq!(region, Region::new(400, 350, 200, 100));
    }

    #[test]
    fn test_positioned_windows_keep_position() {
        let screen = Region::new(0, 0, 1000, 800);
        let region = initial_free_region(Region::new(50, 60, 10, 10), None, false, screen);

        // minimum size applies before the decoration is added around it
        assert_eq!(region, Region::new(49, 56, 77, 55));
    }

    #[test]
    fn test_center_rule_wins() {
        let screen = Region::new(0, 0, 1000, 800);
        let region = initial_free_region(Region::new(50, 60, 198, 95), None, true, screen);
        assert_eq!(region.pos.x, 400);
    }

    #[test]
    fn test_constrain_dim() {
        assert_eq!(constrain_dim(Dim::new(10, 500), None), Dim::new(75, 500));
    }
}
