//! Screen Module
//!
//! A physical output with the struts reserved on its edges, and the
//! partition binding it to a context.

use std::collections::HashMap;

use tracing::debug;

use crate::wm::geometry::{Edge, Extents, Index, Region, Strut, Window};

/// One physical output
#[derive(Debug, Clone)]
pub struct Screen {
    full_region: Region,
    placeable_region: Region,
    struts: HashMap<Edge, Vec<Strut>>,
    showing_struts: bool,
}

impl Screen {
    pub fn new(region: Region) -> Self {
        Self {
            full_region: region,
            placeable_region: region,
            struts: HashMap::new(),
            showing_struts: true,
        }
    }

    pub fn full_region(&self) -> Region {
        self.full_region
    }

    /// Resize the output, keeping its struts
    pub fn set_full_region(&mut self, region: Region) {
        self.full_region = region;
        self.compute_placeable_region();
    }

    /// Full region minus the visible struts
    pub fn placeable_region(&self) -> Region {
        self.placeable_region
    }

    pub fn showing_struts(&self) -> bool {
        self.showing_struts
    }

    pub fn add_strut(&mut self, edge: Edge, window: Window, width: u32) {
        let struts = self.struts.entry(edge).or_default();

        if !struts.iter().any(|strut| strut.window == window) {
            debug!("Adding {:?} strut of {} for window {:#x}", edge, width, window);
            struts.push(Strut { window, width });
        }
    }

    /// Register every non-zero edge of `extents` as a strut of `window`
    pub fn add_struts(&mut self, window: Window, extents: Extents) {
        for edge in Edge::ALL {
            let width = extents.get(edge);

            if width > 0 {
                self.add_strut(edge, window, width as u32);
            }
        }
    }

    pub fn remove_window_strut(&mut self, window: Window) -> bool {
        let mut removed = false;

        for struts in self.struts.values_mut() {
            let before = struts.len();
            struts.retain(|strut| strut.window != window);
            removed |= struts.len() != before;
        }

        removed
    }

    pub fn compute_placeable_region(&mut self) {
        let mut reserved = Extents::default();

        if self.showing_struts {
            for (&edge, struts) in &self.struts {
                let width = struts.iter().map(|strut| strut.width as i32).max().unwrap_or(0);
                *reserved.get_mut(edge) = width;
            }
        }

        self.placeable_region = self.full_region.without_extents(reserved);
    }

    /// Show or hide struts; returns the windows that reserve them
    pub fn show_and_yield_struts(&mut self, show: bool) -> Vec<Window> {
        self.showing_struts = show;
        self.compute_placeable_region();

        let mut windows: Vec<Window> = self
            .struts
            .values()
            .flat_map(|struts| struts.iter().map(|strut| strut.window))
            .collect();

        windows.sort_unstable();
        windows.dedup();
        windows
    }

    /// Guess the edge a dock reserves from its geometry
    pub fn infer_dock_strut(&self, geometry: Region) -> Option<(Edge, u32)> {
        let full = self.full_region;
        let (x, y) = (geometry.pos.x - full.pos.x, geometry.pos.y - full.pos.y);
        let (w, h) = (geometry.dim.w, geometry.dim.h);

        let (edge, width) = match ((x, y), (w, h)) {
            ((0, 0), (w, h)) if w == full.dim.w => (Edge::Top, h),
            ((0, 0), (w, h)) if h == full.dim.h => (Edge::Left, w),
            ((0, 0), (w, h)) if w > h => (Edge::Top, h),
            ((0, 0), (w, h)) if w < h => (Edge::Left, w),
            ((_, y), (_, h)) if y == full.dim.h - h => (Edge::Bottom, h),
            ((x, _), (w, _)) if x == full.dim.w - w => (Edge::Right, w),
            _ => return None,
        };

        Some((edge, width.max(0) as u32))
    }
}

/// A screen plus the context shown on it
#[derive(Debug, Clone)]
pub struct Partition {
    screen: Screen,
    context: Option<Index>,
}

impl Partition {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            context: None,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn context(&self) -> Option<Index> {
        self.context
    }

    pub fn set_context(&mut self, context: Option<Index>) {
        self.context = context;
    }

    pub fn placeable_region(&self) -> Region {
        self.screen.placeable_region()
    }
}
