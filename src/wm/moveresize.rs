//! MoveResize Module
//!
//! Single-slot interaction buffers for pointer-driven moves and resizes,
//! and the geometry of a move or resize step.

use crate::wm::geometry::{Corner, Edge, Extents, Pos, Region, Window};
use crate::wm::hints::SizeHints;
use crate::wm::placement::constrain_dim;

/// The part of a window a resize is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grip {
    Edge(Edge),
    Corner(Corner),
}

impl Grip {
    pub fn is_top_grip(&self) -> bool {
        matches!(
            self,
            Grip::Edge(Edge::Top) | Grip::Corner(Corner::TopLeft | Corner::TopRight)
        )
    }

    pub fn is_left_grip(&self) -> bool {
        matches!(
            self,
            Grip::Edge(Edge::Left) | Grip::Corner(Corner::TopLeft | Corner::BottomLeft)
        )
    }

    /// Whether dragging this grip changes the width
    pub fn resizes_width(&self) -> bool {
        !matches!(self, Grip::Edge(Edge::Top | Edge::Bottom))
    }

    /// Whether dragging this grip changes the height
    pub fn resizes_height(&self) -> bool {
        !matches!(self, Grip::Edge(Edge::Left | Edge::Right))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Move,
    Resize,
}

/// What an occupied buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub window: Window,
    pub grip: Grip,
    /// Pointer position when the interaction started
    pub grip_pos: Pos,
    /// Client free region when the interaction started
    pub window_region: Region,
}

/// Move/resize interaction buffer
#[derive(Debug, Clone)]
pub struct Buffer {
    kind: BufferKind,
    /// Input-only window the pointer is confined to
    handle: Window,
    interaction: Option<Interaction>,
}

impl Buffer {
    pub fn new(kind: BufferKind, handle: Window) -> Self {
        Self {
            kind,
            handle,
            interaction: None,
        }
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn handle(&self) -> Window {
        self.handle
    }

    pub fn is_occupied(&self) -> bool {
        self.interaction.is_some()
    }

    pub fn interaction(&self) -> Option<Interaction> {
        self.interaction
    }

    pub fn window(&self) -> Option<Window> {
        self.interaction.map(|interaction| interaction.window)
    }

    pub fn set(&mut self, window: Window, grip: Grip, grip_pos: Pos, window_region: Region) {
        self.interaction = Some(Interaction {
            window,
            grip,
            grip_pos,
            window_region,
        });
    }

    pub fn unset(&mut self) {
        self.interaction = None;
    }
}

impl Interaction {
    /// Region after moving the pointer to `pos`
    pub fn moved_region(&self, pos: Pos) -> Region {
        Region {
            pos: self.window_region.pos + self.grip_pos.dist(pos),
            dim: self.window_region.dim,
        }
    }

    /// Region after dragging the grip to `pos`; the corner opposite the grip
    /// stays fixed
    pub fn resized_region(
        &self,
        pos: Pos,
        frame_extents: Extents,
        size_hints: Option<&SizeHints>,
    ) -> Region {
        let start = self.window_region;
        let delta = self.grip_pos.dist(pos);

        let mut region = start.without_extents(frame_extents);

        if self.grip.resizes_width() {
            let dest_w = if self.grip.is_left_grip() {
                region.dim.w - delta.dx
            } else {
                region.dim.w + delta.dx
            };

            region.dim.w = dest_w;
        }

        if self.grip.resizes_height() {
            let dest_h = if self.grip.is_top_grip() {
                region.dim.h - delta.dy
            } else {
                region.dim.h + delta.dy
            };

            region.dim.h = dest_h;
        }

        region.dim = constrain_dim(region.dim, size_hints);

        let mut region = region.with_extents(frame_extents);

        if self.grip.is_top_grip() {
            region.pos.y = start.pos.y + (start.dim.h - region.dim.h);
        }

        if self.grip.is_left_grip() {
            region.pos.x = start.pos.x + (start.dim.w - region.dim.w);
        }

        region
    }
}
