//! Model Module
//!
//! The window-management state engine. The model owns every container
//! (partitions, contexts, workspaces), every client and the focus pointer,
//! and drives the placement -> decoration -> map -> stack pipeline through
//! a [`Connection`] whenever its state changes.

mod actions;
mod handlers;
mod interaction;
mod manage;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::wm::binding::{KeyBindings, MouseBindings};
use crate::wm::client::{Client, PlacementClass};
use crate::wm::client_flags::{IcccmWindowState, Toggle, WindowState};
use crate::wm::connection::Connection;
use crate::wm::context::Context;
use crate::wm::cycle::{Cycle, InsertPos};
use crate::wm::decoration::Palette;
use crate::wm::geometry::{Index, Pid, Region, Window};
use crate::wm::hints::Hints;
use crate::wm::moveresize::{Buffer, BufferKind};
use crate::wm::placement::{Placement, PlacementMethod};
use crate::wm::screen::{Partition, Screen};
use crate::wm::selector::ClientSelector;
use crate::wm::stacking::{StackHandler, StackLayer};
use crate::wm::workspace::Workspace;

/// Name advertised through `_NET_WM_NAME` on the supporting window
pub const WM_NAME: &str = "krane";

pub struct Model<C: Connection> {
    conn: C,

    partitions: Cycle<Partition>,
    contexts: Cycle<Context>,

    client_map: HashMap<Window, Client>,
    /// frame -> inner window
    frame_map: HashMap<Window, Window>,
    pid_map: HashMap<Pid, Window>,
    /// Free regions to restore when leaving fullscreen
    fullscreen_regions: HashMap<Window, Region>,
    unmanaged_windows: HashSet<Window>,

    focus: Option<Window>,
    jumped_from: Option<Window>,

    stack: StackHandler,
    /// Order last issued to the server, bottom to top
    stacking_order: Vec<Window>,
    /// Client lists last published to the root window
    client_list: Vec<Window>,
    client_list_stacking: Vec<Window>,

    move_buffer: Buffer,
    resize_buffer: Buffer,

    palette: Palette,
    key_bindings: KeyBindings,
    mouse_bindings: MouseBindings,

    ignore_producers: Vec<ClientSelector>,
    ignore_consumers: Vec<ClientSelector>,
    producer_cache: HashMap<String, bool>,
    consumer_cache: HashMap<String, bool>,

    focus_follows_mouse: bool,
    warp_pointer: bool,
    layout_dir: PathBuf,

    running: bool,
}

impl<C: Connection> Model<C> {
    /// Build the container hierarchy over the connected outputs and take
    /// over the windows that already exist
    pub fn new(mut conn: C, config: &Config) -> Result<Self> {
        info!("Initializing window manager model");

        let outputs = conn.connected_outputs();
        if outputs.is_empty() {
            bail!("No screens found on the display");
        }

        let partitions: Vec<Partition> = outputs
            .iter()
            .map(|&region| Partition::new(Screen::new(region)))
            .collect();

        let names = config.workspace_names();
        let contexts: Vec<Context> = (0..config.context_count())
            .map(|i| Context::new(context_name(i), &names))
            .collect();

        let mut partitions = Cycle::new(partitions);
        let mut contexts = Cycle::new(contexts);

        for i in 0..partitions.len().min(contexts.len()) {
            contexts[i].set_partition(Some(i));
            partitions[i].set_context(Some(i));
        }

        debug!(
            "WM: {} partition(s), {} context(s) of {} workspace(s)",
            partitions.len(),
            contexts.len(),
            names.len()
        );

        let move_buffer = Buffer::new(BufferKind::Move, conn.create_handle());
        let resize_buffer = Buffer::new(BufferKind::Resize, conn.create_handle());

        let key_bindings = config.key_bindings();
        let mouse_bindings = MouseBindings::default();

        conn.init_wm_properties(WM_NAME, &names);
        conn.grab_bindings(&key_bindings.inputs(), &mouse_bindings.inputs());
        conn.set_current_desktop(0);

        let mut model = Self {
            conn,
            partitions,
            contexts,
            client_map: HashMap::new(),
            frame_map: HashMap::new(),
            pid_map: HashMap::new(),
            fullscreen_regions: HashMap::new(),
            unmanaged_windows: HashSet::new(),
            focus: None,
            jumped_from: None,
            stack: StackHandler::new(),
            stacking_order: Vec::new(),
            client_list: Vec::new(),
            client_list_stacking: Vec::new(),
            move_buffer,
            resize_buffer,
            palette: config.palette(),
            key_bindings,
            mouse_bindings,
            ignore_producers: config.ignore_producers(),
            ignore_consumers: config.ignore_consumers(),
            producer_cache: HashMap::new(),
            consumer_cache: HashMap::new(),
            focus_follows_mouse: config.behavior.focus_follows_mouse,
            warp_pointer: config.behavior.warp_pointer,
            layout_dir: config.layout_dir(),
            running: true,
        };

        for window in model.conn.top_level_windows() {
            model.map_request(window, false);
        }

        model.conn.flush();
        info!("Window manager model ready");

        Ok(model)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn conn(&self) -> &C {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn focused(&self) -> Option<Window> {
        self.focus
    }

    pub fn client(&self, window: Window) -> Option<&Client> {
        self.client_map.get(&window)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.client_map.values()
    }

    pub fn active_context(&self) -> Index {
        self.contexts.active_index().unwrap_or(0)
    }

    pub fn active_workspace(&self) -> Index {
        self.contexts
            .get(self.active_context())
            .map_or(0, Context::active_workspace)
    }

    pub fn workspace(&self, context: Index, workspace: Index) -> Option<&Workspace> {
        self.contexts
            .get(context)
            .and_then(|context| context.workspace(workspace))
    }

    fn workspace_mut(&mut self, context: Index, workspace: Index) -> Option<&mut Workspace> {
        self.contexts
            .get_mut(context)
            .and_then(|context| context.workspace_mut(workspace))
    }

    pub fn context(&self, context: Index) -> Option<&Context> {
        self.contexts.get(context)
    }

    fn active_pair(&self) -> (Index, Index) {
        (self.active_context(), self.active_workspace())
    }

    /// Partition a context is shown on, falling back to the active one
    fn partition_of(&self, context: Index) -> Option<&Partition> {
        self.contexts
            .get(context)
            .and_then(Context::partition)
            .and_then(|partition| self.partitions.get(partition))
            .or_else(|| self.partitions.active_element())
    }

    fn active_partition_index(&self) -> Index {
        self.contexts
            .get(self.active_context())
            .and_then(Context::partition)
            .or_else(|| self.partitions.active_index())
            .unwrap_or(0)
    }

    /// Inner window of a client, looked up by its window or its frame
    fn window_of(&self, window: Window) -> Option<Window> {
        if self.client_map.contains_key(&window) {
            Some(window)
        } else {
            self.frame_map.get(&window).copied()
        }
    }

    /// Whether `workspace` is the one currently shown for its context
    fn is_visible(&self, context: Index, workspace: Index) -> bool {
        self.contexts.get(context).is_some_and(|context| {
            context.partition().is_some() && context.active_workspace() == workspace
        })
    }

    fn is_interacting(&self) -> bool {
        self.move_buffer.is_occupied() || self.resize_buffer.is_occupied()
    }

    /// Placed by its free region, either by its own state or because its
    /// workspace uses a free layout
    fn is_free(&self, client: &Client) -> bool {
        if client.is_fullscreen() && !client.is_contained() {
            return false;
        }

        client.is_free()
            || self
                .workspace(client.context(), client.workspace())
                .is_some_and(|workspace| {
                    workspace.layout().config().method == PlacementMethod::Free
                })
    }

    fn is_focusable(client: &Client) -> bool {
        client.is_managed() && !client.is_disowned() && !client.is_iconified()
    }

    // ------------------------------------------------------------------
    // Placement pipeline
    // ------------------------------------------------------------------

    /// Re-arrange a workspace, if it is shown
    fn apply_layout(&mut self, context: Index, workspace: Index) {
        if !self.is_visible(context, workspace) {
            return;
        }

        let Some(partition) = self.partition_of(context) else {
            return;
        };

        let full_region = partition.screen().full_region();
        let placeable_region = partition.screen().placeable_region();

        let Some(placements) = self.workspace(context, workspace).map(|workspace| {
            workspace.arrange(full_region, placeable_region, &self.client_map, |client| {
                !client.is_managed()
            })
        }) else {
            return;
        };

        debug!(
            "Applying layout to workspace {} of context {} ({} placements)",
            workspace,
            context,
            placements.len()
        );

        for placement in placements {
            self.place_client(placement);
        }
    }

    /// The single path that hands geometry to the server
    fn place_client(&mut self, placement: Placement) {
        let Some(client) = self.client_map.get_mut(&placement.window) else {
            return;
        };

        let free = placement.method == PlacementMethod::Free;
        let same_decoration = client.decoration() == placement.decoration;
        client.set_decoration(placement.decoration, free);

        let Some(region) = placement.region else {
            self.unmap_client(placement.window);
            self.render_decoration(placement.window);
            return;
        };

        client.set_region(if free {
            PlacementClass::Free(region)
        } else {
            PlacementClass::Tile(region)
        });

        let (window, frame) = client.windows();
        let frame_region = client.frame_region();

        // a pure translation leaves the inner window where it is
        if client.is_mapped() && same_decoration && client.previous_region().dim == region.dim {
            self.conn.move_window(frame, frame_region.pos);
            self.render_decoration(window);
            return;
        }

        let inner_region = client.inner_region();
        let frame_extents = client.frame_extents();

        self.conn.place_window(frame, &frame_region);
        self.conn.place_window(window, &inner_region);
        self.conn.set_window_frame_extents(window, frame_extents);

        self.render_decoration(window);
        self.map_client(window);
    }

    /// Free-mode placement with the client's free decoration
    fn reposition_free(&mut self, window: Window, region: Region) {
        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        let decoration = client.free_decoration();
        self.place_client(Placement::new(
            PlacementMethod::Free,
            window,
            decoration,
            Some(region),
        ));
    }

    fn map_client(&mut self, window: Window) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        if client.is_mapped() {
            return;
        }

        let (window, frame) = client.windows();
        client.set_mapped(Toggle::On);

        debug!("Mapping client {:#x}", window);
        self.conn.map_window(window);
        self.conn.map_window(frame);
        self.conn
            .set_icccm_window_state(window, IcccmWindowState::Normal);
    }

    /// Unmap a client, remembering that the resulting unmap notification
    /// is self-inflicted
    fn unmap_client(&mut self, window: Window) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        if !client.is_mapped() {
            return;
        }

        let (window, frame) = client.windows();
        client.set_mapped(Toggle::Off);
        client.expect_unmap();

        debug!("Unmapping client {:#x}", window);
        self.conn.unmap_window(window);
        self.conn.unmap_window(frame);
        self.conn
            .set_icccm_window_state(window, IcccmWindowState::Iconic);
    }

    fn render_decoration(&mut self, window: Window) {
        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        let frame = client.frame();
        let (border, frame_color) = client.decoration_colors(&self.palette);

        match border {
            Some((width, color)) => {
                self.conn.set_window_border_width(frame, width.max(0) as u32);
                self.conn.set_window_border_color(frame, color);
            }
            None => self.conn.set_window_border_width(frame, 0),
        }

        if let Some(color) = frame_color {
            self.conn.set_window_background_color(frame, color);
        }
    }

    // ------------------------------------------------------------------
    // Stacking
    // ------------------------------------------------------------------

    /// Recompute the global z-order and restack the part that changed
    fn apply_stack(&mut self, context: Index, workspace: Index) {
        if !self.is_visible(context, workspace) {
            return;
        }

        let Some(windows) = self
            .workspace(context, workspace)
            .map(Workspace::stack_after_focus)
        else {
            return;
        };

        let mut regular = Vec::new();
        let mut fullscreen = Vec::new();
        let mut free = Vec::new();

        for window in windows {
            let Some(client) = self.client_map.get(&window) else {
                continue;
            };

            if !client.is_managed() {
                continue;
            }

            if client.is_fullscreen() && !client.is_contained() {
                fullscreen.push(client.frame());
            } else if client.is_free() {
                free.push(client.frame());
            } else {
                regular.push(client.frame());
            }
        }

        let mut order = Vec::new();
        order.extend(self.stack.layer_windows(StackLayer::Desktop));
        order.extend(self.stack.layer_windows(StackLayer::Below));
        order.extend(self.stack.layer_windows(StackLayer::Dock));
        order.extend(regular);
        order.extend(fullscreen);
        order.extend(free);
        order.extend(self.stack.layer_windows(StackLayer::Above));
        order.extend(self.stack.layer_windows(StackLayer::Notification));

        self.stack.apply_relations(&mut order);

        let unchanged = self
            .stacking_order
            .iter()
            .zip(order.iter())
            .take_while(|(prev, next)| prev == next)
            .count();

        if unchanged < order.len() {
            debug!("Restacking {} window(s)", order.len() - unchanged);

            for i in unchanged..order.len() {
                let sibling = i.checked_sub(1).map(|prev| order[prev]);
                self.conn.stack_window_above(order[i], sibling);
            }
        }

        self.stacking_order = order;
        self.update_client_lists();
    }

    /// Publish the managed clients, oldest first and by focus, whenever
    /// either list differs from what the root window holds
    fn update_client_lists(&mut self) {
        let mut clients: Vec<&Client> = self
            .client_map
            .values()
            .filter(|client| client.is_managed())
            .collect();

        clients.sort_by_key(|client| client.managed_since());
        let by_age: Vec<Window> = clients.iter().map(|client| client.window()).collect();

        clients.sort_by_key(|client| client.last_focused());
        let by_focus: Vec<Window> = clients.iter().map(|client| client.window()).collect();

        if by_age != self.client_list {
            self.conn.update_client_list(&by_age);
            self.client_list = by_age;
        }

        if by_focus != self.client_list_stacking {
            self.conn.update_client_list_stacking(&by_focus);
            self.client_list_stacking = by_focus;
        }
    }

    fn apply_active(&mut self) {
        let (context, workspace) = self.active_pair();
        self.apply_layout(context, workspace);
        self.apply_stack(context, workspace);
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    pub fn focus(&mut self, window: Window) {
        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        if !Self::is_focusable(client) || self.focus == Some(window) {
            return;
        }

        let (context, workspace, frame) = (client.context(), client.workspace(), client.frame());

        let in_order = self
            .workspace(context, workspace)
            .is_some_and(|ws| ws.clients().contains(&window));

        if !in_order {
            return;
        }

        if context != self.active_context() {
            self.show_context(context);
        }

        if workspace != self.active_workspace() {
            self.show_workspace(context, workspace);
        }

        if let Some(prev) = self.focus {
            self.unfocus(prev);
        }

        info!("Focusing client {:#x}", window);
        self.conn.ungrab_buttons(frame);

        let mut warp_target = None;
        let mut was_urgent = false;
        if let Some(client) = self.client_map.get_mut(&window) {
            was_urgent = client.is_urgent();
            client.focus();
            client.touch();
            client.set_urgent(Toggle::Off);

            let region = client.active_region();
            warp_target = Some(
                client
                    .warp_pos()
                    .filter(|&pos| region.contains(pos))
                    .unwrap_or_else(|| region.center()),
            );
        }

        self.conn
            .set_window_state(window, WindowState::DemandsAttention, false);

        if was_urgent {
            if let Some(hints) = self
                .conn
                .get_icccm_window_hints(window)
                .filter(|hints| hints.urgent)
            {
                self.conn.set_icccm_window_hints(
                    window,
                    Hints {
                        urgent: false,
                        ..hints
                    },
                );
            }
        }

        let mut rearrange = false;
        if let Some(ws) = self.workspace_mut(context, workspace) {
            ws.focus_client(window);
            let config = ws.layout().config();
            rearrange = config.persistent || config.single;
        }

        self.focus = Some(window);

        if rearrange {
            self.apply_layout(context, workspace);
        }

        if self.conn.get_focused_window() != Some(window) {
            self.conn.focus_window(window);
        }

        if self.warp_pointer && !self.is_interacting() {
            let pointer = self.conn.get_pointer_position();
            let inside = self
                .client_map
                .get(&window)
                .is_some_and(|client| client.active_region().contains(pointer));

            if let (false, Some(target)) = (inside, warp_target) {
                self.conn.warp_pointer(target);
            }
        }

        self.render_decoration(window);
        self.apply_stack(context, workspace);
    }

    fn unfocus(&mut self, window: Window) {
        let pointer = self.conn.get_pointer_position();

        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        debug!("Unfocusing client {:#x}", window);
        client.unfocus();

        if client.active_region().contains(pointer) {
            client.set_warp_pos(pointer);
        }

        let frame = client.frame();
        self.conn.regrab_buttons(frame);
        self.render_decoration(window);
    }

    /// Make the focus pointer agree with the active workspace
    fn sync_focus(&mut self) {
        let (context, workspace) = self.active_pair();
        let focused = self
            .workspace(context, workspace)
            .and_then(Workspace::focused_client);

        match focused {
            Some(window) if Some(window) != self.focus => self.focus(window),
            Some(_) => {}
            None => {
                if let Some(prev) = self.focus.take() {
                    self.unfocus(prev);
                }

                self.conn.unfocus();
            }
        }
    }

    // ------------------------------------------------------------------
    // Workspaces and contexts
    // ------------------------------------------------------------------

    /// Switch the workspace shown for `context` without touching focus
    fn show_workspace(&mut self, context: Index, to: Index) {
        let Some(ctx) = self.contexts.get(context) else {
            return;
        };

        let from = ctx.active_workspace();
        if to == from || to >= ctx.workspace_count() {
            return;
        }

        let sticky = ctx.sticky_clients().to_vec();
        let name = ctx.workspace(to).map(|ws| ws.name().to_string()).unwrap_or_default();
        let context_label = ctx.name().to_string();

        self.stop_moving();
        self.stop_resizing();

        info!("Activating workspace {} of context {}", name, context_label);

        for window in sticky {
            let moved = self
                .workspace_mut(context, from)
                .is_some_and(|ws| ws.remove_client(window));

            if moved {
                if let Some(ws) = self.workspace_mut(context, to) {
                    ws.add_client(window, InsertPos::Back);
                }

                if let Some(client) = self.client_map.get_mut(&window) {
                    client.set_workspace(to);
                }

                self.conn.set_window_desktop(window, to);
            }
        }

        let shown = self
            .contexts
            .get_mut(context)
            .is_some_and(|ctx| ctx.activate_workspace(to) && ctx.partition().is_some());

        if !shown {
            return;
        }

        self.apply_layout(context, to);

        let hidden = self
            .workspace(context, from)
            .map(Workspace::clients)
            .unwrap_or_default();

        for window in hidden {
            self.unmap_client(window);
        }

        if context == self.active_context() {
            self.conn.set_current_desktop(to);
        }
    }

    pub fn activate_workspace(&mut self, to: Index) {
        let context = self.active_context();
        self.show_workspace(context, to);
        self.sync_focus();
        self.apply_stack(context, to);
    }

    /// Show `context` on the active partition without touching focus
    fn show_context(&mut self, to: Index) {
        let from = self.active_context();
        if to == from || to >= self.contexts.len() {
            return;
        }

        self.stop_moving();
        self.stop_resizing();

        info!("Activating context {}", self.contexts[to].name());

        let partition = self.active_partition_index();
        let other = self.contexts[to].partition();

        self.contexts[to].set_partition(Some(partition));
        if let Some(p) = self.partitions.get_mut(partition) {
            p.set_context(Some(to));
        }

        match other {
            Some(other) if other != partition => {
                // swap: the previous context moves to the other screen
                self.contexts[from].set_partition(Some(other));
                if let Some(p) = self.partitions.get_mut(other) {
                    p.set_context(Some(from));
                }

                let workspace = self.contexts[from].active_workspace();
                self.apply_layout(from, workspace);
            }
            _ => {
                self.contexts[from].set_partition(None);

                let workspace = self.contexts[from].active_workspace();
                let hidden = self
                    .workspace(from, workspace)
                    .map(Workspace::clients)
                    .unwrap_or_default();

                for window in hidden {
                    self.unmap_client(window);
                }
            }
        }

        self.contexts.activate_at_index(to);
        self.partitions.activate_at_index(partition);

        let workspace = self.contexts[to].active_workspace();
        self.apply_layout(to, workspace);
        self.conn.set_current_desktop(workspace);
    }

    pub fn activate_context(&mut self, to: Index) {
        self.show_context(to);
        self.sync_focus();
        self.apply_active();
    }

    /// Re-read the outputs after a screen change
    fn acquire_partitions(&mut self) {
        let outputs = self.conn.connected_outputs();

        if outputs.is_empty() {
            warn!("No outputs reported, keeping current partitions");
            return;
        }

        info!("Acquiring {} partition(s)", outputs.len());

        for (i, &region) in outputs.iter().enumerate() {
            match self.partitions.get_mut(i) {
                Some(partition) => partition.screen_mut().set_full_region(region),
                None => self
                    .partitions
                    .insert_at_back(Partition::new(Screen::new(region))),
            }
        }

        while self.partitions.len() > outputs.len() {
            let last = self.partitions.len() - 1;

            if let Some(context) = self
                .partitions
                .remove_at_index(last)
                .and_then(|partition| partition.context())
            {
                self.contexts[context].set_partition(None);

                let workspace = self.contexts[context].active_workspace();
                let hidden = self
                    .workspace(context, workspace)
                    .map(Workspace::clients)
                    .unwrap_or_default();

                for window in hidden {
                    self.unmap_client(window);
                }
            }
        }

        let active = self.active_context();
        if self.contexts[active].partition().is_none() {
            let partition = self.partitions.active_index().unwrap_or(0);

            if let Some(previous) = self.partitions[partition].context() {
                self.contexts[previous].set_partition(None);
            }

            self.contexts[active].set_partition(Some(partition));
            self.partitions[partition].set_context(Some(active));
        }

        for context in 0..self.contexts.len() {
            let workspace = self.contexts[context].active_workspace();
            self.apply_layout(context, workspace);
        }

        self.sync_focus();
        self.apply_active();
    }

    // ------------------------------------------------------------------
    // Exit
    // ------------------------------------------------------------------

    /// Hand every window back to the root and clear the root properties
    pub fn exit(&mut self) {
        info!("Exiting window manager");

        self.stop_moving();
        self.stop_resizing();

        for context in 0..self.contexts.len() {
            for workspace in 0..self.contexts[context].workspace_count() {
                self.deiconify_all(context, workspace);
            }
        }

        let mut windows: Vec<(Window, Window, Region)> = self
            .client_map
            .values()
            .map(|client| (client.window(), client.frame(), client.free_region()))
            .collect();

        windows.sort_unstable_by_key(|&(window, _, _)| window);

        for (window, frame, region) in windows {
            self.conn.unparent_window(window, region.pos);
            self.conn.map_window(window);
            self.conn.cleanup_window(window);
            self.conn.destroy_window(frame);
        }

        self.conn.cleanup();
        self.conn.flush();
        self.running = false;
    }
}

/// Contexts are named by the letters they are addressed with
fn context_name(index: Index) -> String {
    char::from(b'a' + (index as u8 % 26)).to_string()
}
