//! Workspace Module
//!
//! One arrangement of clients under one layout. A workspace keeps three
//! client cycles (regular, iconified, disowned); a client sits in at most
//! one of them and moves between them in a single cut-and-insert.

use std::collections::HashMap;

use tracing::debug;

use crate::wm::client::Client;
use crate::wm::cycle::{Cycle, InsertPos};
use crate::wm::decoration::Decoration;
use crate::wm::geometry::{Direction, Index, Region, Window};
use crate::wm::layout::{Arrangeable, LayoutHandler, LayoutKind};
use crate::wm::placement::{Placement, PlacementMethod};
use crate::wm::selector::ClientSelector;

#[derive(Debug, Clone)]
pub struct Workspace {
    number: Index,
    name: String,
    layout: LayoutHandler,
    clients: Cycle<Window>,
    icons: Cycle<Window>,
    disowned: Cycle<Window>,
}

impl Workspace {
    pub fn new(number: Index, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            layout: LayoutHandler::new(LayoutKind::Stack),
            clients: Cycle::default(),
            icons: Cycle::default(),
            disowned: Cycle::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &LayoutHandler {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutHandler {
        &mut self.layout
    }

    pub fn clients(&self) -> Vec<Window> {
        self.clients.iter().copied().collect()
    }

    pub fn icons(&self) -> Vec<Window> {
        self.icons.iter().copied().collect()
    }

    pub fn disowned(&self) -> Vec<Window> {
        self.disowned.iter().copied().collect()
    }

    /// Whether `window` is in any of the three cycles
    pub fn contains(&self, window: Window) -> bool {
        self.clients.contains(&window)
            || self.icons.contains(&window)
            || self.disowned.contains(&window)
    }

    pub fn focused_client(&self) -> Option<Window> {
        self.clients.active_element().copied()
    }

    pub fn focused_icon(&self) -> Option<Window> {
        self.icons.active_element().copied()
    }

    pub fn add_client(&mut self, window: Window, pos: InsertPos) {
        if self.contains(window) {
            return;
        }

        debug!("Adding window {:#x} to workspace {}", window, self.number);
        self.clients.insert_at(pos, window);
    }

    /// Remove `window` from whichever cycle holds it
    pub fn remove_client(&mut self, window: Window) -> bool {
        self.clients.remove_element(&window).is_some()
            || self.icons.remove_element(&window).is_some()
            || self.disowned.remove_element(&window).is_some()
    }

    /// Put `new` in the slot of `old`, keeping active-ness
    pub fn replace_client(&mut self, old: Window, new: Window) -> bool {
        if self.clients.contains(&new) {
            return false;
        }

        self.clients.replace_element(&old, new)
    }

    pub fn focus_client(&mut self, window: Window) -> bool {
        self.clients.activate_element(&window).is_some()
    }

    pub fn client_to_icon(&mut self, window: Window) -> bool {
        match self.clients.remove_element(&window) {
            Some(window) => {
                self.icons.insert_at(InsertPos::Back, window);
                self.icons.activate_element(&window);
                true
            }
            None => false,
        }
    }

    pub fn icon_to_client(&mut self, window: Window) -> bool {
        match self.icons.remove_element(&window) {
            Some(window) => {
                self.clients.insert_at(InsertPos::AfterActive, window);
                true
            }
            None => false,
        }
    }

    pub fn client_to_disowned(&mut self, window: Window) -> bool {
        match self.clients.remove_element(&window) {
            Some(window) => {
                self.disowned.insert_at(InsertPos::Back, window);
                true
            }
            None => false,
        }
    }

    pub fn disowned_to_client(&mut self, window: Window) -> bool {
        match self.disowned.remove_element(&window) {
            Some(window) => {
                self.clients.insert_at(InsertPos::AfterActive, window);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Ordering
    // ------------------------------------------------------------------

    pub fn cycle_focus(&mut self, dir: Direction) -> Option<Window> {
        let wraps = self.layout.config().wraps;
        self.clients.cycle_active(dir, wraps).copied()
    }

    pub fn drag_focus(&mut self, dir: Direction) -> Option<Window> {
        let wraps = self.layout.config().wraps;
        self.clients.drag_active(dir, wraps).copied()
    }

    pub fn rotate_clients(&mut self, dir: Direction) {
        self.clients.rotate(dir);
    }

    pub fn reverse_clients(&mut self) {
        self.clients.reverse();
    }

    /// Rotate only the clients in the main area
    pub fn shuffle_main(&mut self, dir: Direction) {
        let main_count = self.layout.data().main_count as usize;
        self.clients.rotate_range(dir, 0, main_count);
    }

    /// Rotate only the clients outside the main area
    pub fn shuffle_stack(&mut self, dir: Direction) {
        let main_count = self.layout.data().main_count as usize;
        let len = self.clients.len();
        self.clients.rotate_range(dir, main_count, len);
    }

    /// Clients bottom to top, the active one last
    pub fn stack_after_focus(&self) -> Vec<Window> {
        self.clients.stack_after_active().into_iter().copied().collect()
    }

    /// Resolve a positional selector against this workspace
    pub fn get_client_for(&self, selector: &ClientSelector) -> Option<Window> {
        match selector {
            ClientSelector::AtIndex(index) => self.clients.get(*index).copied(),
            ClientSelector::First => self.clients.get(0).copied(),
            ClientSelector::Last => self.clients.as_slice().last().copied(),
            ClientSelector::Main if self.layout.data().main_count > 0 => {
                self.clients.get(0).copied()
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Arrangement
    // ------------------------------------------------------------------

    /// Placements for every regular client
    ///
    /// Fullscreen clients cover `full_region`, free clients keep their free
    /// region and only the remaining clients go through the layout, inside
    /// `placeable_region`. Clients selected by `hidden` get no region.
    pub fn arrange(
        &self,
        full_region: Region,
        placeable_region: Region,
        client_map: &HashMap<Window, Client>,
        hidden: impl Fn(&Client) -> bool,
    ) -> Vec<Placement> {
        let mut placements = Vec::with_capacity(self.clients.len());
        let mut tiled = Vec::with_capacity(self.clients.len());

        let config = self.layout.config();
        let float_decoration = match config.method {
            PlacementMethod::Free => config.decoration,
            PlacementMethod::Tile => Decoration::FREE_DECORATION,
        };

        for &window in self.clients.iter() {
            let Some(client) = client_map.get(&window) else {
                continue;
            };

            if hidden(client) {
                placements.push(Placement::new(
                    PlacementMethod::Tile,
                    window,
                    client.decoration(),
                    None,
                ));
            } else if client.is_fullscreen() && !client.is_contained() {
                placements.push(Placement::new(
                    PlacementMethod::Tile,
                    window,
                    Decoration::NO_DECORATION,
                    Some(full_region),
                ));
            } else if client.is_floating() {
                placements.push(Placement::new(
                    PlacementMethod::Free,
                    window,
                    float_decoration,
                    Some(client.free_region()),
                ));
            } else {
                tiled.push(Arrangeable {
                    window,
                    free_region: client.free_region(),
                });
            }
        }

        let focus = self.focused_client();
        placements.extend(self.layout.arrange(placeable_region, &tiled, focus));
        placements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client::PlacementClass;
    use crate::wm::client_flags::Toggle;

    fn client_map(windows: &[Window]) -> HashMap<Window, Client> {
        windows
            .iter()
            .map(|&window| {
                let mut client = Client::new(
                    window,
                    window + 100,
                    String::new(),
                    String::new(),
                    String::new(),
                    None,
                    None,
                );
                client.set_region(PlacementClass::Free(Region::new(5, 5, 100, 100)));
                (window, client)
            })
            .collect()
    }

    fn workspace(windows: &[Window]) -> Workspace {
        let mut workspace = Workspace::new(0, "1");
        for &window in windows {
            workspace.add_client(window, InsertPos::Back);
        }
        workspace
    }

    #[test]
    fn test_membership_is_exclusive() {
        let mut ws = workspace(&[1, 2, 3]);
        ws.add_client(2, InsertPos::Back);
        assert_eq!(ws.clients(), vec![1, 2, 3]);

        assert!(ws.client_to_icon(2));
        assert!(!ws.client_to_icon(2));
        assert_eq!(ws.clients(), vec![1, 3]);
        assert_eq!(ws.icons(), vec![2]);

        ws.add_client(2, InsertPos::Back);
        assert_eq!(ws.clients(), vec![1, 3]);

        assert!(ws.icon_to_client(2));
        assert!(ws.client_to_disowned(3));
        assert!(ws.contains(3));
        assert!(ws.remove_client(3));
        assert!(!ws.contains(3));
    }

    #[test]
    fn test_replace_keeps_slot() {
        let mut ws = workspace(&[1, 2, 3]);
        ws.focus_client(2);
        assert!(ws.replace_client(2, 9));
        assert_eq!(ws.clients(), vec![1, 9, 3]);
        assert_eq!(ws.focused_client(), Some(9));
        assert!(!ws.replace_client(1, 3));
    }

    #[test]
    fn test_cycle_respects_layout_wrap() {
        let mut ws = workspace(&[1, 2, 3]);
        ws.focus_client(3);
        assert_eq!(ws.cycle_focus(Direction::Forward), Some(1));

        ws.layout_mut().set_kind(LayoutKind::Paper);
        assert_eq!(ws.cycle_focus(Direction::Backward), None);
        assert_eq!(ws.focused_client(), Some(1));
    }

    #[test]
    fn test_shuffle_main_and_stack() {
        let mut ws = workspace(&[1, 2, 3, 4]);
        ws.layout_mut().change_main_count(1);
        ws.shuffle_main(Direction::Forward);
        assert_eq!(ws.clients(), vec![2, 1, 3, 4]);
        ws.shuffle_stack(Direction::Backward);
        assert_eq!(ws.clients(), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_selectors() {
        let mut ws = workspace(&[1, 2, 3]);
        assert_eq!(ws.get_client_for(&ClientSelector::AtIndex(1)), Some(2));
        assert_eq!(ws.get_client_for(&ClientSelector::Last), Some(3));
        assert_eq!(ws.get_client_for(&ClientSelector::Main), Some(1));
        assert_eq!(ws.get_client_for(&ClientSelector::AtIndex(7)), None);

        ws.layout_mut().change_main_count(-1);
        assert_eq!(ws.get_client_for(&ClientSelector::Main), None);
    }

    #[test]
    fn test_arrange_partitions_clients() {
        let ws = workspace(&[1, 2, 3, 4]);
        let mut map = client_map(&[1, 2, 3, 4]);
        map.get_mut(&1).unwrap().set_fullscreen(Toggle::On);
        map.get_mut(&2).unwrap().set_floating(Toggle::On);

        let full = Region::new(0, 0, 1000, 800);
        let placeable = Region::new(0, 20, 1000, 780);
        let placements = ws.arrange(full, placeable, &map, |client| client.window() == 4);

        assert_eq!(placements.len(), 4);
        assert_eq!(placements[0].region, Some(full));
        assert_eq!(placements[1].method, PlacementMethod::Free);
        assert_eq!(placements[1].region, Some(Region::new(5, 5, 100, 100)));
        assert_eq!(placements[2].window, 4);
        assert_eq!(placements[2].region, None);
        assert_eq!(placements[3].window, 3);
        assert_eq!(placements[3].region, Some(placeable));
        assert_eq!(placements[3].decoration, Decoration::NO_DECORATION);
    }

    #[test]
    fn test_floating_clients_follow_float_decoration() {
        let mut ws = workspace(&[1]);
        let mut map = client_map(&[1]);
        map.get_mut(&1).unwrap().set_floating(Toggle::On);

        let region = Region::new(0, 0, 1000, 800);
        let placements = ws.arrange(region, region, &map, |_| false);
        assert_eq!(placements[0].decoration, Decoration::FREE_DECORATION);

        ws.layout_mut().set_kind(LayoutKind::FramelessFloat);
        let placements = ws.arrange(region, region, &map, |_| false);
        assert_eq!(placements[0].decoration, Decoration::BORDER_DECORATION);
    }
}
