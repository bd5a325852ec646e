//! Geometry Module
//!
//! Plain value types for positions, dimensions, regions and decoration
//! extents. Regions are expressed in root coordinates unless noted.

use serde::{Deserialize, Serialize};

/// X11 window identifier; also the stable handle of a managed client
pub type Window = u32;

/// Process identifier reported through `_NET_WM_PID`
pub type Pid = u32;

/// Position in a container
pub type Index = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_origin(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Distance travelled from `self` to `other`
    pub fn dist(&self, other: Pos) -> Distance {
        Distance {
            dx: other.x - self.x,
            dy: other.y - self.y,
        }
    }
}

impl std::ops::Add<Distance> for Pos {
    type Output = Pos;

    fn add(self, dist: Distance) -> Pos {
        Pos {
            x: self.x + dist.dx,
            y: self.y + dist.dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Distance {
    pub dx: i32,
    pub dy: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dim {
    pub w: i32,
    pub h: i32,
}

impl Dim {
    pub fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}

/// Four-sided padding: decoration extents, screen margins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extents {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Extents {
    pub const fn uniform(width: i32) -> Self {
        Self {
            left: width,
            right: width,
            top: width,
            bottom: width,
        }
    }

    pub fn get(&self, edge: Edge) -> i32 {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }

    pub fn get_mut(&mut self, edge: Edge) -> &mut i32 {
        match edge {
            Edge::Left => &mut self.left,
            Edge::Right => &mut self.right,
            Edge::Top => &mut self.top,
            Edge::Bottom => &mut self.bottom,
        }
    }
}

impl std::ops::Add for Extents {
    type Output = Extents;

    fn add(self, other: Extents) -> Extents {
        Extents {
            left: self.left + other.left,
            right: self.right + other.right,
            top: self.top + other.top,
            bottom: self.bottom + other.bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Cycling direction through an ordered container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub pos: Pos,
    pub dim: Dim,
}

impl Region {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            pos: Pos { x, y },
            dim: Dim { w, h },
        }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.x >= self.pos.x
            && pos.y >= self.pos.y
            && pos.x < self.pos.x + self.dim.w
            && pos.y < self.pos.y + self.dim.h
    }

    /// Grow outward by `extents`
    pub fn with_extents(&self, extents: Extents) -> Self {
        Self {
            pos: Pos {
                x: self.pos.x - extents.left,
                y: self.pos.y - extents.top,
            },
            dim: Dim {
                w: self.dim.w + extents.left + extents.right,
                h: self.dim.h + extents.top + extents.bottom,
            },
        }
    }

    /// Shrink inward by `extents`
    pub fn without_extents(&self, extents: Extents) -> Self {
        Self {
            pos: Pos {
                x: self.pos.x + extents.left,
                y: self.pos.y + extents.top,
            },
            dim: Dim {
                w: self.dim.w - extents.left - extents.right,
                h: self.dim.h - extents.top - extents.bottom,
            },
        }
    }

    pub fn with_minimum_dim(&self, min: Dim) -> Self {
        Self {
            pos: self.pos,
            dim: Dim {
                w: self.dim.w.max(min.w),
                h: self.dim.h.max(min.h),
            },
        }
    }

    /// A region of size `dim` centered inside `self`
    pub fn center_of(&self, dim: Dim) -> Self {
        Self {
            pos: Pos {
                x: self.pos.x + (self.dim.w - dim.w) / 2,
                y: self.pos.y + (self.dim.h - dim.h) / 2,
            },
            dim,
        }
    }

    pub fn center(&self) -> Pos {
        Pos {
            x: self.pos.x + self.dim.w / 2,
            y: self.pos.y + self.dim.h / 2,
        }
    }

    pub fn nearest_corner(&self, pos: Pos) -> Corner {
        let center = self.center();

        match (pos.x >= center.x, pos.y >= center.y) {
            (false, false) => Corner::TopLeft,
            (true, false) => Corner::TopRight,
            (false, true) => Corner::BottomLeft,
            (true, true) => Corner::BottomRight,
        }
    }
}

/// A screen-edge reservation made by a dock or panel window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Strut {
    pub window: Window,
    pub width: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extents_roundtrip() {
        let region = Region::new(10, 20, 300, 200);
        let extents = Extents {
            left: 1,
            right: 2,
            top: 3,
            bottom: 4,
        };

        let outer = region.with_extents(extents);
        assert_eq!(outer, Region::new(9, 17, 303, 207));
        assert_eq!(outer.without_extents(extents), region);
    }

    #[test]
    fn test_center_and_corners() {
        let screen = Region::new(0, 0, 1000, 800);
        assert_eq!(screen.center_of(Dim::new(200, 100)), Region::new(400, 350, 200, 100));

        assert_eq!(screen.nearest_corner(Pos::new(10, 10)), Corner::TopLeft);
        assert_eq!(screen.nearest_corner(Pos::new(900, 10)), Corner::TopRight);
        assert_eq!(screen.nearest_corner(Pos::new(10, 700)), Corner::BottomLeft);
        assert_eq!(screen.nearest_corner(Pos::new(900, 700)), Corner::BottomRight);
    }

    #[test]
    fn test_pos_distance() {
        let start = Pos::new(100, 100);
        let dist = start.dist(Pos::new(90, 130));
        assert_eq!(dist, Distance { dx: -10, dy: 30 });
        assert_eq!(Pos::new(5, 5) + dist, Pos::new(-5, 35));
    }
}
