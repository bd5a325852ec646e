//! Stacking Module
//!
//! Global z-order layers for windows that live outside the per-workspace
//! client order (desktops, docks, notifications, ...) and explicit
//! above/below relationships requested by clients or transients.

use std::collections::HashMap;

use tracing::debug;

use crate::wm::geometry::Window;

/// Window layer (for stacking)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StackLayer {
    Desktop,
    Below,
    Dock,
    Above,
    Notification,
}

/// Stacking handler
#[derive(Debug, Default)]
pub struct StackHandler {
    /// Layer of every layered window, with insertion order per layer
    window_layers: HashMap<Window, StackLayer>,
    layers: HashMap<StackLayer, Vec<Window>>,
    /// window -> sibling it must sit directly above
    above_other: HashMap<Window, Window>,
    /// window -> sibling it must sit directly below
    below_other: HashMap<Window, Window>,
}

impl StackHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `window` into `layer`, moving it out of any previous layer
    pub fn add_window(&mut self, window: Window, layer: StackLayer) {
        if self.window_layers.get(&window) == Some(&layer) {
            return;
        }

        self.remove_from_layer(window);
        debug!("Stacking window {:#x} in layer {:?}", window, layer);

        self.window_layers.insert(window, layer);
        self.layers.entry(layer).or_default().push(window);
    }

    pub fn add_above_other(&mut self, window: Window, sibling: Window) {
        self.below_other.remove(&window);
        self.above_other.insert(window, sibling);
    }

    pub fn add_below_other(&mut self, window: Window, sibling: Window) {
        self.above_other.remove(&window);
        self.below_other.insert(window, sibling);
    }

    /// Forget `window` entirely, including relations that point at it
    pub fn remove_window(&mut self, window: Window) {
        self.remove_from_layer(window);
        self.above_other.remove(&window);
        self.below_other.remove(&window);
        self.above_other.retain(|_, &mut sibling| sibling != window);
        self.below_other.retain(|_, &mut sibling| sibling != window);
    }

    fn remove_from_layer(&mut self, window: Window) {
        if let Some(layer) = self.window_layers.remove(&window) {
            if let Some(windows) = self.layers.get_mut(&layer) {
                windows.retain(|&candidate| candidate != window);
            }
        }
    }

    pub fn layer_windows(&self, layer: StackLayer) -> Vec<Window> {
        self.layers.get(&layer).cloned().unwrap_or_default()
    }

    /// Rearrange `windows` (bottom to top) so that every above/below
    /// relation whose sibling is present is honoured
    pub fn apply_relations(&self, windows: &mut Vec<Window>) {
        let related = |window: &Window| {
            self.above_other.contains_key(window) || self.below_other.contains_key(window)
        };

        let (moved, mut kept): (Vec<Window>, Vec<Window>) =
            windows.iter().copied().partition(|window| related(window));

        for window in moved {
            let position = match (self.above_other.get(&window), self.below_other.get(&window)) {
                (Some(sibling), _) => kept
                    .iter()
                    .position(|candidate| candidate == sibling)
                    .map(|index| index + 1),
                (_, Some(sibling)) => kept.iter().position(|candidate| candidate == sibling),
                _ => None,
            };

            match position {
                Some(index) => kept.insert(index, window),
                None => kept.push(window),
            }
        }

        *windows = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_keep_insertion_order() {
        let mut stack = StackHandler::new();
        stack.add_window(10, StackLayer::Dock);
        stack.add_window(11, StackLayer::Dock);
        stack.add_window(12, StackLayer::Notification);

        assert_eq!(stack.layer_windows(StackLayer::Dock), vec![10, 11]);
        assert_eq!(stack.layer_windows(StackLayer::Below), Vec::<Window>::new());

        stack.add_window(10, StackLayer::Above);
        assert_eq!(stack.layer_windows(StackLayer::Dock), vec![11]);
        assert_eq!(stack.layer_windows(StackLayer::Above), vec![10]);
    }

    #[test]
    fn test_relations() {
        let mut stack = StackHandler::new();
        stack.add_above_other(1, 3);
        stack.add_below_other(4, 2);

        let mut windows = vec![1, 2, 3, 4];
        stack.apply_relations(&mut windows);
        assert_eq!(windows, vec![4, 2, 3, 1]);

        // relations pointing at a removed window are dropped
        stack.remove_window(3);
        let mut windows = vec![1, 3];
        stack.apply_relations(&mut windows);
        assert_eq!(windows, vec![1, 3]);
    }

    #[test]
    fn test_relation_to_missing_sibling_goes_on_top() {
        let mut stack = StackHandler::new();
        stack.add_above_other(1, 99);

        let mut windows = vec![1, 2];
        stack.apply_relations(&mut windows);
        assert_eq!(windows, vec![2, 1]);
    }
}
