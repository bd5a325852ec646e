//! Window lifecycle: managing new windows, consuming producers and
//! removing clients again.

use tracing::{debug, info};

use super::Model;
use crate::wm::client::{Client, PlacementClass};
use crate::wm::client_flags::{IcccmWindowState, Toggle, WindowState, WindowType};
use crate::wm::connection::Connection;
use crate::wm::cycle::InsertPos;
use crate::wm::decoration::Decoration;
use crate::wm::geometry::{Edge, Index, Pos, Window};
use crate::wm::placement::initial_free_region;
use crate::wm::rules::Rules;
use crate::wm::selector::ClientSelector;
use crate::wm::stacking::StackLayer;

/// Upper bound on the process ancestry walked to find a producer
const MAX_PRODUCER_DEPTH: usize = 32;

impl<C: Connection> Model<C> {
    /// Entry point for windows that ask to be mapped
    pub(super) fn map_request(&mut self, window: Window, ignore: bool) {
        if self.client_map.contains_key(&window)
            || self.frame_map.contains_key(&window)
            || self.unmanaged_windows.contains(&window)
        {
            return;
        }

        let window_type = self.conn.get_window_preferred_type(window);

        let unmanaged = matches!(
            window_type,
            WindowType::Desktop
                | WindowType::Dock
                | WindowType::Notification
                | WindowType::Tooltip
                | WindowType::Dnd
                | WindowType::DropdownMenu
                | WindowType::PopupMenu
                | WindowType::Combo
        );

        if ignore || unmanaged || !self.conn.must_manage_window(window) {
            self.manage_unmanaged(window, window_type);
        } else {
            self.manage(window, window_type);
        }
    }

    /// Track a window the manager maps but never frames
    fn manage_unmanaged(&mut self, window: Window, window_type: WindowType) {
        debug!("WM: Window {:#x} ({:?}) stays unmanaged", window, window_type);

        let preferred_state = self.conn.get_window_preferred_state(window);

        let layer = match (window_type, preferred_state) {
            (WindowType::Desktop, _) => Some(StackLayer::Desktop),
            (WindowType::Dock, _) => Some(StackLayer::Dock),
            (WindowType::Notification, _) => Some(StackLayer::Notification),
            (_, Some(WindowState::Below)) => Some(StackLayer::Below),
            (_, Some(WindowState::Above)) => Some(StackLayer::Above),
            _ => None,
        };

        if let Some(layer) = layer {
            self.stack.add_window(window, layer);
        }

        if self.add_window_struts(window, window_type) {
            self.apply_all_layouts();
        }

        self.conn.init_unmanaged(window);

        if self.conn.window_is_mappable(window) {
            self.conn.map_window(window);
        }

        self.unmanaged_windows.insert(window);

        let (context, workspace) = self.active_pair();
        self.apply_stack(context, workspace);
    }

    /// Reserve screen edges for a dock-like window; true when the placeable
    /// region changed
    pub(super) fn add_window_struts(&mut self, window: Window, window_type: WindowType) -> bool {
        let strut = self.conn.get_window_strut(window);
        let geometry = self.conn.get_window_geometry(window);
        let partition = self.active_partition_index();

        let Some(partition) = self.partitions.get_mut(partition) else {
            return false;
        };

        let screen = partition.screen_mut();
        let before = screen.placeable_region();

        match strut {
            Some(extents) => screen.add_struts(window, extents),
            None if window_type == WindowType::Dock => {
                if let Some((edge, width)) = geometry.and_then(|g| screen.infer_dock_strut(g)) {
                    screen.add_strut(edge, window, width);
                }
            }
            None => return false,
        }

        screen.compute_placeable_region();
        screen.placeable_region() != before
    }

    fn apply_all_layouts(&mut self) {
        for context in 0..self.contexts.len() {
            let workspace = self.contexts[context].active_workspace();
            self.apply_layout(context, workspace);
        }
    }

    /// Frame and adopt a top-level window
    fn manage(&mut self, window: Window, window_type: WindowType) {
        let Some(geometry) = self.conn.get_window_geometry(window) else {
            debug!("WM: Window {:#x} vanished before it could be managed", window);
            return;
        };

        let pid = self.conn.get_window_pid(window);
        let ppid = pid.and_then(|pid| self.conn.get_parent_pid(pid));

        let name = self.conn.get_icccm_window_name(window);
        let class = self.conn.get_icccm_window_class(window);
        let instance = self.conn.get_icccm_window_instance(window);
        let rules = Rules::parse(&instance);

        let size_hints = self.conn.get_icccm_window_size_hints(window);
        let hints = self.conn.get_icccm_window_hints(window);
        let preferred_state = self.conn.get_window_preferred_state(window);

        let parent = self
            .conn
            .get_icccm_window_transient_for(window)
            .filter(|parent| self.client_map.contains_key(parent));

        let leader = self.conn.get_icccm_window_client_leader(window);

        let floating = rules.float()
            || self.conn.must_free_window(window)
            || parent.is_some()
            || size_hints.is_some_and(|size_hints| size_hints.is_fixed());

        let fullscreen = rules.fullscreen()
            || self.conn.window_is_fullscreen(window)
            || preferred_state == Some(WindowState::Fullscreen);

        let sticky = self.conn.window_is_sticky(window);

        // Step 1: Decide where the client lives
        let context = rules
            .context
            .filter(|&context| context < self.contexts.len())
            .unwrap_or_else(|| self.active_context());

        let workspace_count = self.contexts[context].workspace_count();

        let active_workspace = self.contexts[context].active_workspace();

        // sticky clients always live on the shown workspace
        let workspace = if sticky {
            active_workspace
        } else {
            rules
                .workspace
                .or_else(|| {
                    // transients and group members join their owner
                    parent
                        .or(leader)
                        .and_then(|owner| self.client_map.get(&owner))
                        .map(Client::workspace)
                })
                .or_else(|| self.conn.get_window_desktop(window))
                .filter(|&workspace| workspace < workspace_count)
                .unwrap_or(active_workspace)
        };

        // Step 2: Compute the initial free region
        let screen = match parent.and_then(|parent| self.client_map.get(&parent)) {
            Some(parent) => parent.active_region(),
            None => self
                .partition_of(context)
                .map(|partition| partition.placeable_region())
                .unwrap_or(geometry),
        };

        let free_region = initial_free_region(geometry, size_hints.as_ref(), rules.center(), screen);

        // Step 3: Build the client and its frame
        let frame = self.conn.create_frame(free_region);

        let mut client = Client::new(
            window,
            frame,
            name,
            class,
            instance,
            pid,
            ppid,
        );

        client.set_context(context);
        client.set_workspace(workspace);
        client.set_size_hints(size_hints);
        client.set_decoration(Decoration::FREE_DECORATION, true);
        client.set_region(PlacementClass::Free(free_region));
        client.set_floating(Toggle::from(floating));

        if hints.is_some_and(|hints| hints.urgent) {
            client.set_urgent(Toggle::On);
        }

        if let Some(parent) = parent {
            client.set_parent(parent);

            if let Some(parent_client) = self.client_map.get_mut(&parent) {
                parent_client.add_child(window);
                let parent_frame = parent_client.frame();
                self.stack.add_above_other(frame, parent_frame);
            }
        }

        // Step 4: Reparent into the frame
        let inner_pos = client.inner_region().pos;
        let extents = client.frame_extents();

        self.conn.reparent_window(window, frame, inner_pos);
        self.conn.init_window(window, self.focus_follows_mouse);
        self.conn.init_frame(frame, self.focus_follows_mouse);
        self.conn
            .set_icccm_window_state(window, IcccmWindowState::Normal);
        self.conn.set_window_desktop(window, workspace);
        self.conn.set_window_frame_extents(window, extents);

        // Step 5: Register
        self.client_map.insert(window, client);
        self.frame_map.insert(frame, window);

        if let Some(pid) = pid {
            self.pid_map.insert(pid, window);
        }

        if let Some(ws) = self.workspace_mut(context, workspace) {
            ws.add_client(window, InsertPos::AfterActive);
        }

        if fullscreen {
            self.set_fullscreen(window, Toggle::On);
        }

        if sticky {
            self.set_sticky(window, Toggle::On);
        }

        for &edge in &rules.snap_edges {
            self.snap_client(window, edge);
        }

        // Step 6: Swallow the producer, if any
        if let Some(producer) = self.find_producer(window) {
            if self.may_consume(producer, window) {
                self.consume_client(producer, window);
            }
        }

        self.apply_layout(context, workspace);

        if rules.focus() && !self.is_interacting() {
            self.focus(window);
        } else {
            self.apply_stack(context, workspace);
        }

        self.update_client_lists();

        info!(
            "Managing {:?} client {:#x} on workspace {} of context {}",
            window_type, window, workspace, context
        );
    }

    /// Walk the process ancestry of `consumer` up to the nearest managed
    /// client
    pub(super) fn find_producer(&self, consumer: Window) -> Option<Window> {
        let client = self.client_map.get(&consumer)?;
        let mut ppid = client.ppid();

        for _ in 0..MAX_PRODUCER_DEPTH {
            let pid = ppid?;

            if let Some(&producer) = self.pid_map.get(&pid) {
                if producer != consumer {
                    return Some(producer);
                }
            }

            ppid = self.conn.get_parent_pid(pid);
        }

        None
    }

    pub(super) fn may_consume(&mut self, producer: Window, consumer: Window) -> bool {
        let (Some(producer_client), Some(consumer_client)) =
            (self.client_map.get(&producer), self.client_map.get(&consumer))
        else {
            return false;
        };

        if !producer_client.is_producing()
            || !producer_client.is_managed()
            || producer_client.producer().is_some()
            || consumer_client.parent().is_some()
        {
            return false;
        }

        let producer_handle = producer_client.handle();
        let consumer_handle = consumer_client.handle();

        let producer_ignored = *self
            .producer_cache
            .entry(producer_handle)
            .or_insert_with(|| any_match(&self.ignore_producers, producer_client));

        let consumer_ignored = *self
            .consumer_cache
            .entry(consumer_handle)
            .or_insert_with(|| any_match(&self.ignore_consumers, consumer_client));

        !producer_ignored && !consumer_ignored
    }

    /// Replace `producer` by `consumer` until the last consumer is gone
    pub(super) fn consume_client(&mut self, producer: Window, consumer: Window) {
        let Some(producer_client) = self.client_map.get(&producer) else {
            return;
        };

        let first = producer_client.consumer_len() == 0;
        let (p_context, p_workspace) = (producer_client.context(), producer_client.workspace());

        let Some(consumer_client) = self.client_map.get_mut(&consumer) else {
            return;
        };

        let (c_context, c_workspace) = (consumer_client.context(), consumer_client.workspace());
        consumer_client.set_producer(producer);

        info!("Client {:#x} consumes {:#x}", consumer, producer);

        if first {
            if (p_context, p_workspace) == (c_context, c_workspace) {
                if let Some(ws) = self.workspace_mut(c_context, c_workspace) {
                    ws.remove_client(consumer);
                    ws.replace_client(producer, consumer);
                }
            } else if let Some(ws) = self.workspace_mut(p_context, p_workspace) {
                ws.remove_client(producer);
            }

            self.unmanage(producer);
        }

        if let Some(producer_client) = self.client_map.get_mut(&producer) {
            producer_client.add_consumer(consumer);
        }

        self.apply_layout(p_context, p_workspace);
        self.apply_layout(c_context, c_workspace);
    }

    /// Detach `consumer`, restoring its producer when it was the last one
    pub(super) fn unconsume_client(&mut self, consumer: Window) {
        let Some(producer) = self.client_map.get(&consumer).and_then(Client::producer) else {
            return;
        };

        let (context, workspace) = match self.client_map.get(&consumer) {
            Some(client) => (client.context(), client.workspace()),
            None => return,
        };

        if let Some(client) = self.client_map.get_mut(&consumer) {
            client.unset_producer();
        }

        let Some(producer_client) = self.client_map.get_mut(&producer) else {
            return;
        };

        producer_client.remove_consumer(consumer);

        if producer_client.consumer_len() > 0 {
            return;
        }

        info!("Client {:#x} no longer consumes {:#x}", consumer, producer);

        producer_client.set_context(context);
        producer_client.set_workspace(workspace);
        self.conn.set_window_desktop(producer, workspace);

        if let Some(ws) = self.workspace_mut(context, workspace) {
            if !ws.replace_client(consumer, producer) {
                ws.add_client(producer, InsertPos::Back);
            }
        }

        self.remanage(producer);
    }

    /// Take a client out of the arrangement without forgetting it
    fn unmanage(&mut self, window: Window) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        debug!("WM: Unmanaging client {:#x}", window);
        client.set_managed(Toggle::Off);

        let context = client.context();
        if client.is_sticky() {
            self.contexts[context].remove_sticky(window);
        }

        if self.focus == Some(window) {
            self.focus = None;
            self.unfocus(window);
        }

        self.unmap_client(window);
    }

    fn remanage(&mut self, window: Window) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        debug!("WM: Remanaging client {:#x}", window);
        client.set_managed(Toggle::On);

        let (context, workspace) = (client.context(), client.workspace());
        if client.is_sticky() {
            self.contexts[context].add_sticky(window);
        }

        self.apply_layout(context, workspace);
        self.focus(window);
    }

    /// Forget a client whose window is gone
    pub(super) fn remove_window(&mut self, window: Window) {
        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        let (frame, context, workspace) = (client.frame(), client.context(), client.workspace());
        let producer = client.producer();
        let consumers = client.consumers().to_vec();
        let parent = client.parent();
        let children = client.children().to_vec();
        let pid = client.pid();
        let free_pos: Pos = client.free_region().pos;

        // Step 1: Release the server resources
        self.conn.unparent_window(window, free_pos);
        self.conn.cleanup_window(window);
        self.conn.destroy_window(frame);

        // Step 2: Unlink from the ownership graph
        self.contexts[context].remove_sticky(window);

        if self.jumped_from == Some(window) {
            self.jumped_from = None;
        }

        if producer.is_some() {
            self.unconsume_client(window);
        }

        for consumer in consumers {
            if let Some(consumer) = self.client_map.get_mut(&consumer) {
                consumer.unset_producer();
            }
        }

        if let Some(parent) = parent.and_then(|parent| self.client_map.get_mut(&parent)) {
            parent.remove_child(window);
        }

        for child in children {
            if let Some(child) = self.client_map.get_mut(&child) {
                child.unset_parent();
            }
        }

        // Step 3: Drop every reference
        if let Some(ws) = self.workspace_mut(context, workspace) {
            ws.remove_client(window);
        }

        self.stack.remove_window(frame);
        self.stacking_order.retain(|&w| w != frame);
        self.client_map.remove(&window);
        self.frame_map.remove(&frame);
        self.fullscreen_regions.remove(&window);

        if let Some(pid) = pid {
            if self.pid_map.get(&pid) == Some(&window) {
                self.pid_map.remove(&pid);
            }
        }

        if self.focus == Some(window) {
            self.focus = None;
        }

        if self.move_buffer.window() == Some(window) {
            self.stop_moving();
        }

        if self.resize_buffer.window() == Some(window) {
            self.stop_resizing();
        }

        info!("Removed client {:#x}", window);

        self.apply_layout(context, workspace);
        self.sync_focus();

        let (context, workspace) = self.active_pair();
        self.apply_stack(context, workspace);
        self.update_client_lists();
    }

    /// Forget an unmanaged window
    pub(super) fn remove_unmanaged(&mut self, window: Window) {
        if !self.unmanaged_windows.remove(&window) {
            return;
        }

        debug!("WM: Unmanaged window {:#x} removed", window);
        self.stack.remove_window(window);
        self.stacking_order.retain(|&w| w != window);

        let mut changed = false;
        for partition in self.partitions.iter_mut() {
            let screen = partition.screen_mut();

            if screen.remove_window_strut(window) {
                screen.compute_placeable_region();
                changed = true;
            }
        }

        if changed {
            self.apply_all_layouts();
        }
    }

    /// Snap a free client against one screen edge
    pub(super) fn snap_client(&mut self, window: Window, edge: Edge) {
        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        if !self.is_free(client) {
            return;
        }

        let Some(screen) = self
            .partition_of(client.context())
            .map(|partition| partition.placeable_region())
        else {
            return;
        };

        let mut region = client.free_region();

        match edge {
            Edge::Left => region.pos.x = screen.pos.x,
            Edge::Right => region.pos.x = screen.pos.x + screen.dim.w - region.dim.w,
            Edge::Top => region.pos.y = screen.pos.y,
            Edge::Bottom => region.pos.y = screen.pos.y + screen.dim.h - region.dim.h,
        }

        debug!("WM: Snapping client {:#x} to {:?}", window, edge);
        self.reposition_free(window, region);
    }

    /// Context and workspace of a managed client
    pub(super) fn location_of(&self, window: Window) -> Option<(Index, Index)> {
        self.client_map
            .get(&window)
            .map(|client| (client.context(), client.workspace()))
    }
}

fn any_match(selectors: &[ClientSelector], client: &Client) -> bool {
    selectors.iter().any(|selector| selector.matches(client))
}
