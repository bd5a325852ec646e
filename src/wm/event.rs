//! Event Module
//!
//! The closed set of events the display adapter delivers to the model.

use crate::wm::binding::{KeyInput, MouseInput};
use crate::wm::client_flags::{ToggleAction, WindowState};
use crate::wm::geometry::{Dim, Pos, Region, Window};
use crate::wm::moveresize::Grip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press,
    Release,
    Motion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub input: MouseInput,
    /// Window under the pointer, if any
    pub window: Option<Window>,
    /// Pointer position relative to the root window
    pub root_rpos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMode {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Name,
    Class,
    Size,
    Strut,
    Hints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Mouse {
        event: MouseEvent,
        on_root: bool,
    },
    Key {
        input: KeyInput,
    },
    MapRequest {
        window: Window,
        ignore: bool,
    },
    Map {
        window: Window,
        ignore: bool,
    },
    Enter {
        window: Window,
        root_rpos: Pos,
        window_rpos: Pos,
    },
    Leave {
        window: Window,
        root_rpos: Pos,
        window_rpos: Pos,
    },
    Destroy {
        window: Window,
    },
    Expose {
        window: Window,
    },
    Unmap {
        window: Window,
        ignore: bool,
    },
    Configure {
        window: Window,
        region: Region,
        on_root: bool,
    },
    StateRequest {
        window: Window,
        state: WindowState,
        action: ToggleAction,
        on_root: bool,
    },
    FocusRequest {
        window: Window,
        on_root: bool,
    },
    CloseRequest {
        window: Window,
        on_root: bool,
    },
    WorkspaceRequest {
        window: Option<Window>,
        index: usize,
        on_root: bool,
    },
    PlacementRequest {
        window: Window,
        pos: Option<Pos>,
        dim: Option<Dim>,
        on_root: bool,
    },
    GripRequest {
        window: Window,
        pos: Pos,
        grip: Option<Grip>,
        on_root: bool,
    },
    RestackRequest {
        window: Window,
        sibling: Window,
        mode: StackMode,
        on_root: bool,
    },
    Property {
        window: Window,
        kind: PropertyKind,
        on_root: bool,
    },
    FrameExtentsRequest {
        window: Window,
        on_root: bool,
    },
    ScreenChange,
}
