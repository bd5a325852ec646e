//! Event dispatch from the display adapter into the model.

use tracing::{debug, trace, warn};

use super::Model;
use crate::wm::binding::{KeyAction, KeyInput, MouseAction};
use crate::wm::client_flags::{IcccmWindowState, Toggle, ToggleAction, WindowState};
use crate::wm::connection::Connection;
use crate::wm::decoration::Decoration;
use crate::wm::event::{Event, MouseEvent, MouseEventKind, PropertyKind, StackMode};
use crate::wm::geometry::{Dim, Index, Pos, Region, Window};
use crate::wm::moveresize::Grip;
use crate::wm::placement::constrain_dim;

impl<C: Connection> Model<C> {
    pub fn handle_event(&mut self, event: Event) {
        trace!("WM: Handling {:?}", event);

        match event {
            Event::Mouse { event, on_root } => self.handle_mouse(event, on_root),
            Event::Key { input } => self.handle_key(&input),
            Event::MapRequest { window, ignore } => self.map_request(window, ignore),
            Event::Map { .. } | Event::Expose { .. } | Event::Leave { .. } => {}
            Event::Enter { window, .. } => self.handle_enter(window),
            Event::Destroy { window } => self.handle_destroy(window),
            Event::Unmap { window, ignore } => self.handle_unmap(window, ignore),
            Event::Configure { on_root, .. } => {
                if on_root {
                    self.acquire_partitions();
                }
            }
            Event::ScreenChange => self.acquire_partitions(),
            Event::StateRequest {
                window,
                state,
                action,
                ..
            } => self.handle_state_request(window, state, action),
            Event::FocusRequest { window, .. } => {
                if let Some(window) = self.window_of(window) {
                    self.focus(window);
                }
            }
            Event::CloseRequest { window, .. } => {
                let invincible = self
                    .client(window)
                    .is_some_and(|client| client.is_invincible());

                if !invincible {
                    self.conn.close_window(window);
                }
            }
            Event::WorkspaceRequest { window, index, .. } => {
                self.handle_workspace_request(window, index)
            }
            Event::PlacementRequest {
                window, pos, dim, ..
            } => self.handle_placement_request(window, pos, dim),
            Event::GripRequest { window, grip, .. } => self.handle_grip_request(window, grip),
            Event::RestackRequest {
                window,
                sibling,
                mode,
                ..
            } => self.handle_restack_request(window, sibling, mode),
            Event::Property { window, kind, .. } => self.handle_property(window, kind),
            Event::FrameExtentsRequest { window, .. } => {
                let extents = self
                    .client(window)
                    .map(|client| client.frame_extents())
                    .unwrap_or_else(|| Decoration::FREE_DECORATION.extents());

                self.conn.set_window_frame_extents(window, extents);
            }
        }

        self.conn.flush();
    }

    fn handle_mouse(&mut self, event: MouseEvent, on_root: bool) {
        match event.kind {
            MouseEventKind::Release => {
                self.stop_moving();
                self.stop_resizing();
            }
            MouseEventKind::Motion => {
                if self.move_buffer.is_occupied() {
                    self.handle_move(event.root_rpos);
                } else if self.resize_buffer.is_occupied() {
                    self.handle_resize(event.root_rpos);
                }
            }
            MouseEventKind::Press => {
                let target = if on_root {
                    None
                } else {
                    event.window.and_then(|window| self.window_of(window))
                };

                match (self.mouse_bindings.get(&event.input), target) {
                    (Some(MouseAction::Move), Some(window)) => {
                        self.focus(window);
                        self.start_moving(window);
                    }
                    (Some(MouseAction::Resize), Some(window)) => {
                        self.focus(window);
                        self.start_resizing(window, None);
                    }
                    (Some(MouseAction::ToggleFloat), Some(window)) => {
                        self.set_floating(window, Toggle::Reverse);
                    }
                    (Some(MouseAction::Command(command)), _) => {
                        if let Err(e) = self.execute(command) {
                            warn!("Mouse binding failed: {}", e);
                        }
                    }
                    (_, Some(window)) => self.focus(window),
                    (_, None) => {}
                }
            }
        }
    }

    fn handle_key(&mut self, input: &KeyInput) {
        match self.key_bindings.get(input).cloned() {
            Some(KeyAction::Command(command)) => {
                if let Err(e) = self.execute(command) {
                    warn!("Key binding {} failed: {}", input, e);
                }
            }
            Some(KeyAction::Spawn(command)) => self.spawn(&command),
            None => debug!("WM: No binding for {}", input),
        }
    }

    fn handle_enter(&mut self, window: Window) {
        if !self.focus_follows_mouse || self.is_interacting() {
            return;
        }

        if let Some(window) = self.window_of(window) {
            self.focus(window);
        }
    }

    fn handle_destroy(&mut self, window: Window) {
        if self.unmanaged_windows.contains(&window) {
            self.remove_unmanaged(window);
            return;
        }

        if self.client_map.contains_key(&window) {
            self.remove_window(window);
        }
    }

    fn handle_unmap(&mut self, window: Window, ignore: bool) {
        if ignore {
            return;
        }

        if self.unmanaged_windows.contains(&window) {
            self.remove_unmanaged(window);
            return;
        }

        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        if client.consume_unmap_if_expecting() {
            return;
        }

        debug!("WM: Client {:#x} withdrew itself", window);
        self.conn
            .set_icccm_window_state(window, IcccmWindowState::Withdrawn);
        self.remove_window(window);
    }

    fn handle_state_request(&mut self, window: Window, state: WindowState, action: ToggleAction) {
        let Some(window) = self.window_of(window) else {
            return;
        };

        let toggle = match action {
            ToggleAction::Add => Toggle::On,
            ToggleAction::Remove => Toggle::Off,
            ToggleAction::Toggle => Toggle::Reverse,
        };

        match state {
            WindowState::Fullscreen => self.set_fullscreen(window, toggle),
            WindowState::Sticky => self.set_sticky(window, toggle),
            WindowState::DemandsAttention => self.set_urgent(window, toggle),
            WindowState::Hidden => {
                let iconified = self
                    .client(window)
                    .is_some_and(|client| client.is_iconified());

                match (toggle.eval(iconified), iconified) {
                    (true, false) => self.iconify(window),
                    (false, true) => self.deiconify(window, true),
                    _ => {}
                }
            }
            state => debug!("WM: Ignoring state request {:?} for {:#x}", state, window),
        }
    }

    fn handle_workspace_request(&mut self, window: Option<Window>, index: Index) {
        let context = self.active_context();
        if index >= self.contexts[context].workspace_count() {
            return;
        }

        match window.and_then(|window| self.window_of(window)) {
            Some(window) => self.move_client_to_workspace(window, index),
            None => self.activate_workspace(index),
        }
    }

    fn handle_placement_request(&mut self, window: Window, pos: Option<Pos>, dim: Option<Dim>) {
        let Some(client) = self.client_map.get(&window) else {
            if self.unmanaged_windows.contains(&window) || !self.frame_map.contains_key(&window) {
                let Some(mut region) = self.conn.get_window_geometry(window) else {
                    return;
                };

                if let Some(pos) = pos {
                    region.pos = pos;
                }

                if let Some(dim) = dim {
                    region.dim = dim;
                }

                self.conn.place_window(window, &region);
            }

            return;
        };

        if !self.is_free(client) {
            // refuse, but confirm the current geometry to the client
            let inner = client.inner_region();
            self.conn.place_window(window, &inner);
            return;
        }

        let extents = client.free_decoration().extents();
        let mut region = client.free_region();

        if let Some(pos) = pos {
            region.pos = Pos::new(pos.x - extents.left, pos.y - extents.top);
        }

        if let Some(dim) = dim {
            let inner = constrain_dim(dim, client.size_hints().as_ref());
            region.dim = Dim::new(
                inner.w + extents.left + extents.right,
                inner.h + extents.top + extents.bottom,
            );
        }

        self.reposition_free(window, region);
    }

    fn handle_grip_request(&mut self, window: Window, grip: Option<Grip>) {
        let Some(window) = self.window_of(window) else {
            return;
        };

        self.focus(window);

        match grip {
            Some(grip) => self.start_resizing(window, Some(grip)),
            None => self.start_moving(window),
        }
    }

    fn handle_restack_request(&mut self, window: Window, sibling: Window, mode: StackMode) {
        let frame_of = |model: &Self, window: Window| {
            model
                .window_of(window)
                .and_then(|window| model.client_map.get(&window))
                .map(|client| client.frame())
        };

        let (Some(frame), Some(sibling)) = (frame_of(self, window), frame_of(self, sibling)) else {
            return;
        };

        match mode {
            StackMode::Above => self.stack.add_above_other(frame, sibling),
            StackMode::Below => self.stack.add_below_other(frame, sibling),
        }

        let (context, workspace) = self.active_pair();
        self.apply_stack(context, workspace);
    }

    fn handle_property(&mut self, window: Window, kind: PropertyKind) {
        if kind == PropertyKind::Strut {
            if self.unmanaged_windows.contains(&window) {
                self.refresh_struts(window);
            }

            return;
        }

        if !self.client_map.contains_key(&window) {
            return;
        }

        match kind {
            PropertyKind::Name => {
                let name = self.conn.get_icccm_window_name(window);

                if let Some(client) = self.client_map.get_mut(&window) {
                    client.set_name(name);
                }
            }
            PropertyKind::Class => {
                let class = self.conn.get_icccm_window_class(window);
                let instance = self.conn.get_icccm_window_instance(window);

                if let Some(client) = self.client_map.get_mut(&window) {
                    client.set_class(class);
                    client.set_instance(instance);
                }
            }
            PropertyKind::Size => self.refresh_size_hints(window),
            PropertyKind::Hints => {
                let urgent = self
                    .conn
                    .get_icccm_window_hints(window)
                    .is_some_and(|hints| hints.urgent);

                self.set_urgent(window, Toggle::from(urgent));
            }
            PropertyKind::Strut => {}
        }
    }

    fn refresh_size_hints(&mut self, window: Window) {
        let size_hints = self.conn.get_icccm_window_size_hints(window);

        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        client.set_size_hints(size_hints);

        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        if !self.is_free(client) {
            return;
        }

        let extents = client.free_decoration().extents();
        let region = client.free_region();
        let inner = constrain_dim(
            Dim::new(
                region.dim.w - extents.left - extents.right,
                region.dim.h - extents.top - extents.bottom,
            ),
            size_hints.as_ref(),
        );

        let region = Region {
            pos: region.pos,
            dim: Dim::new(
                inner.w + extents.left + extents.right,
                inner.h + extents.top + extents.bottom,
            ),
        };

        self.reposition_free(window, region);
    }

    fn refresh_struts(&mut self, window: Window) {
        for partition in self.partitions.iter_mut() {
            partition.screen_mut().remove_window_strut(window);
        }

        let window_type = self.conn.get_window_preferred_type(window);
        self.add_window_struts(window, window_type);

        for partition in self.partitions.iter_mut() {
            partition.screen_mut().compute_placeable_region();
        }

        self.apply_active();
    }
}
