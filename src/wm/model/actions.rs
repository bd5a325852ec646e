//! User operations, reached through key bindings and IPC commands.

use std::process::{Command as Process, Stdio};

use tracing::{debug, info, warn};

use super::Model;
use crate::wm::client::{Client, PlacementClass};
use crate::wm::client_flags::{Toggle, WindowState};
use crate::wm::command::{Command, CommandError};
use crate::wm::connection::Connection;
use crate::wm::cycle::InsertPos;
use crate::wm::geometry::{Dim, Direction, Edge, Index, Window};
use crate::wm::layout::{LayoutHandler, LayoutKind};
use crate::wm::placement::constrain_dim;
use crate::wm::selector::ClientSelector;
use crate::wm::workspace::Workspace;

/// Pixels moved or resized per nudge/grow/shrink step
const MOVE_STEP: i32 = 15;

impl<C: Connection> Model<C> {
    pub fn execute(&mut self, command: Command) -> Result<(), CommandError> {
        debug!("WM: Executing {:?}", command);

        match command {
            Command::Quit => {
                info!("Quit requested");
                self.running = false;
            }
            Command::KillFocus => self.kill_focus(),

            Command::JumpFirst => self.jump_client(&ClientSelector::First),
            Command::JumpLast => self.jump_client(&ClientSelector::Last),
            Command::JumpMain => self.jump_client(&ClientSelector::Main),
            Command::JumpIndex(index) => self.jump_client(&ClientSelector::AtIndex(index)),
            Command::JumpBack => {
                if let Some(window) = self.jumped_from {
                    self.jump_to(window);
                }
            }
            Command::JumpUrgent => {
                self.jump_client(&ClientSelector::Predicate(Box::new(Client::is_urgent)))
            }

            Command::CycleFocus(dir) => self.reorder(|ws| {
                ws.cycle_focus(dir);
            }),
            Command::DragFocus(dir) => self.reorder(|ws| {
                ws.drag_focus(dir);
            }),
            Command::RotateClients(dir) => self.reorder(|ws| ws.rotate_clients(dir)),
            Command::ShuffleMain(dir) => self.reorder(|ws| ws.shuffle_main(dir)),
            Command::ShuffleStack(dir) => self.reorder(|ws| ws.shuffle_stack(dir)),
            Command::ReverseClients => self.reorder(Workspace::reverse_clients),

            Command::CenterFocus => self.with_focus(Self::center_client),
            Command::SnapFocus(edge) => self.with_focus(|model, window| model.snap_client(window, edge)),
            Command::NudgeFocus(edge) => {
                self.with_focus(|model, window| model.nudge_client(window, edge))
            }
            Command::GrowFocus(edge) => {
                self.with_focus(|model, window| model.stretch_client(window, edge, MOVE_STEP))
            }
            Command::ShrinkFocus(edge) => {
                self.with_focus(|model, window| model.stretch_client(window, edge, -MOVE_STEP))
            }

            Command::ToggleFloat => {
                self.with_focus(|model, window| model.set_floating(window, Toggle::Reverse))
            }
            Command::ToggleFullscreen => {
                self.with_focus(|model, window| model.set_fullscreen(window, Toggle::Reverse))
            }
            Command::ToggleSticky => {
                self.with_focus(|model, window| model.set_sticky(window, Toggle::Reverse))
            }
            Command::ToggleContained => {
                self.with_focus(|model, window| model.set_contained(window, Toggle::Reverse))
            }
            Command::ToggleInvincible => self.with_focus(|model, window| {
                if let Some(client) = model.client_map.get_mut(&window) {
                    client.set_invincible(Toggle::Reverse);
                }
            }),
            Command::ToggleProducing => self.with_focus(|model, window| {
                if let Some(client) = model.client_map.get_mut(&window) {
                    client.set_producing(Toggle::Reverse);
                }
            }),
            Command::ToggleIconifyable => self.with_focus(|model, window| {
                if let Some(client) = model.client_map.get_mut(&window) {
                    client.set_iconifyable(Toggle::Reverse);
                }
            }),
            Command::ToggleDisown => self.toggle_disown(),
            Command::IconifyFocus => self.with_focus(Self::iconify),
            Command::DeiconifyPop => self.pop_deiconify(),
            Command::DeiconifyAll => {
                let (context, workspace) = self.active_pair();
                self.deiconify_all(context, workspace);
            }
            Command::FloatRetainRegion => self.float_retain_region(),

            Command::SetLayout(kind) => self.change_layout(|layout| layout.set_kind(kind)),
            Command::ToggleLayout => self.change_layout(|layout| {
                layout.toggle_kind();
                true
            }),
            Command::CycleLayoutData(dir) => {
                self.change_layout(|layout| layout.cycle_layout_data(dir))
            }
            Command::CopyPrevLayoutData => self.change_layout(LayoutHandler::copy_prev_layout_data),
            Command::ResetLayoutData => self.change_layout(LayoutHandler::reset_layout_data),
            Command::ChangeGapSize(delta) => {
                self.change_layout(|layout| layout.change_gap_size(delta))
            }
            Command::ResetGapSize => self.change_layout(LayoutHandler::reset_gap_size),
            Command::ChangeMainCount(delta) => {
                self.change_layout(|layout| layout.change_main_count(delta))
            }
            Command::ChangeMainFactor(delta) => {
                self.change_layout(|layout| layout.change_main_factor(delta))
            }
            Command::ChangeMargin(edge, delta) => {
                self.change_layout(|layout| layout.change_margin(edge, delta))
            }
            Command::ResetMargin => self.change_layout(LayoutHandler::reset_margin),
            Command::SaveLayout(slot) => self.save_layout(slot)?,
            Command::LoadLayout(slot) => self.load_layout(slot)?,

            Command::ActivateWorkspace(index) => {
                self.check_workspace_index(index)?;
                self.activate_workspace(index);
            }
            Command::ActivateNextWorkspace(dir) => {
                if let Some(index) = self.next_workspace_index(dir) {
                    self.activate_workspace(index);
                }
            }
            Command::ToggleWorkspace => {
                let context = self.active_context();
                if let Some(index) = self.contexts[context].prev_workspace() {
                    self.activate_workspace(index);
                }
            }
            Command::MoveFocusToWorkspace(index) => {
                self.check_workspace_index(index)?;
                self.with_focus(|model, window| model.move_client_to_workspace(window, index));
            }
            Command::MoveFocusToNextWorkspace(dir) => {
                if let Some(index) = self.next_workspace_index(dir) {
                    self.with_focus(|model, window| model.move_client_to_workspace(window, index));
                }
            }
            Command::ActivateContext(index) => {
                self.check_context_index(index)?;
                self.activate_context(index);
            }
            Command::ToggleContext => {
                if let Some(index) = self.contexts.previous_index() {
                    self.activate_context(index);
                }
            }
            Command::MoveFocusToContext(index) => {
                self.check_context_index(index)?;
                self.with_focus(|model, window| model.move_client_to_context(window, index));
            }
            Command::ToggleStruts => self.toggle_struts(),
        }

        self.conn.flush();
        Ok(())
    }

    fn with_focus(&mut self, f: impl FnOnce(&mut Self, Window)) {
        if let Some(window) = self.focus {
            f(self, window);
        }
    }

    fn check_workspace_index(&self, index: Index) -> Result<(), CommandError> {
        if index < self.contexts[self.active_context()].workspace_count() {
            Ok(())
        } else {
            Err(CommandError::IndexOutOfRange(index + 1))
        }
    }

    fn check_context_index(&self, index: Index) -> Result<(), CommandError> {
        if index < self.contexts.len() {
            Ok(())
        } else {
            Err(CommandError::IndexOutOfRange(index + 1))
        }
    }

    fn next_workspace_index(&self, dir: Direction) -> Option<Index> {
        self.contexts[self.active_context()]
            .workspaces()
            .next_index(dir, true)
    }

    // ------------------------------------------------------------------
    // Jumping
    // ------------------------------------------------------------------

    pub fn jump_client(&mut self, selector: &ClientSelector) {
        let target = if selector.is_positional() {
            let (context, workspace) = self.active_pair();
            self.workspace(context, workspace)
                .and_then(|ws| ws.get_client_for(selector))
        } else {
            let mut matches: Vec<&Client> = self
                .client_map
                .values()
                .filter(|client| Self::is_focusable(client) && selector.matches(client))
                .collect();

            matches.sort_by_key(|client| client.last_touched());

            // prefer the most recently touched match that is not focused
            matches
                .iter()
                .rev()
                .find(|client| !client.is_focused())
                .or(matches.last())
                .map(|client| client.window())
        };

        let Some(target) = target else {
            debug!("WM: No client matches {:?}", selector);
            return;
        };

        if self.focus == Some(target) {
            if let Some(window) = self.jumped_from {
                self.jump_to(window);
            }

            return;
        }

        self.jump_to(target);
    }

    fn jump_to(&mut self, target: Window) {
        if !self.client_map.contains_key(&target) || self.focus == Some(target) {
            return;
        }

        self.jumped_from = self.focus;
        self.focus(target);
    }

    // ------------------------------------------------------------------
    // Ordering and layout
    // ------------------------------------------------------------------

    /// Reorder the active workspace, then follow its active client
    fn reorder(&mut self, f: impl FnOnce(&mut Workspace)) {
        let (context, workspace) = self.active_pair();

        if let Some(ws) = self.workspace_mut(context, workspace) {
            f(ws);
        }

        self.sync_focus();
        self.apply_layout(context, workspace);
        self.apply_stack(context, workspace);
    }

    fn change_layout(&mut self, f: impl FnOnce(&mut LayoutHandler) -> bool) {
        let (context, workspace) = self.active_pair();

        let changed = self
            .workspace_mut(context, workspace)
            .is_some_and(|ws| f(ws.layout_mut()));

        if changed {
            if let Some(ws) = self.workspace(context, workspace) {
                info!("Layout of workspace {} is now {}", workspace, ws.layout().kind());
            }

            self.apply_layout(context, workspace);
            self.apply_stack(context, workspace);
        }
    }

    fn save_layout(&mut self, slot: Index) -> Result<(), CommandError> {
        let (context, workspace) = self.active_pair();

        if let Some(ws) = self.workspace(context, workspace) {
            let path = ws
                .layout()
                .save_layout(&self.layout_dir, slot)
                .map_err(|e| CommandError::Layout(format!("{e:#}")))?;

            info!("Saved layout to {:?}", path);
        }

        Ok(())
    }

    fn load_layout(&mut self, slot: Index) -> Result<(), CommandError> {
        let (context, workspace) = self.active_pair();
        let dir = self.layout_dir.clone();

        if let Some(ws) = self.workspace_mut(context, workspace) {
            let kind = ws
                .layout_mut()
                .load_layout(&dir, slot)
                .map_err(|e| CommandError::Layout(format!("{e:#}")))?;

            info!("Loaded {} layout from slot {}", kind, slot);
        }

        self.apply_layout(context, workspace);
        self.apply_stack(context, workspace);
        Ok(())
    }

    fn float_retain_region(&mut self) {
        let (context, workspace) = self.active_pair();

        let Some(windows) = self.workspace(context, workspace).map(Workspace::clients) else {
            return;
        };

        for window in windows {
            if let Some(client) = self.client_map.get_mut(&window) {
                if !client.is_floating() {
                    let region = client.tile_region();
                    client.set_region(PlacementClass::Free(region));
                }
            }
        }

        self.change_layout(|layout| layout.set_kind(LayoutKind::Float));
    }

    fn toggle_struts(&mut self) {
        let partition = self.active_partition_index();

        let Some(screen) = self
            .partitions
            .get_mut(partition)
            .map(|partition| partition.screen_mut())
        else {
            return;
        };

        let show = !screen.showing_struts();
        let windows = screen.show_and_yield_struts(show);

        info!("{} struts", if show { "Showing" } else { "Hiding" });

        for window in windows {
            if show {
                self.conn.map_window(window);
            } else {
                self.conn.unmap_window(window);
            }
        }

        self.apply_active();
    }

    // ------------------------------------------------------------------
    // Client state
    // ------------------------------------------------------------------

    pub(super) fn set_floating(&mut self, window: Window, toggle: Toggle) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        client.set_floating(toggle);
        let (context, workspace) = (client.context(), client.workspace());

        debug!("WM: Client {:#x} floating: {}", window, client.is_floating());
        self.apply_layout(context, workspace);
        self.apply_stack(context, workspace);
    }

    pub(super) fn set_fullscreen(&mut self, window: Window, toggle: Toggle) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        let fullscreen = toggle.eval(client.is_fullscreen());
        if fullscreen == client.is_fullscreen() {
            return;
        }

        if fullscreen {
            self.fullscreen_regions.insert(window, client.free_region());
            client.set_fullscreen(Toggle::On);
        } else {
            client.set_fullscreen(Toggle::Off);

            if let Some(region) = self.fullscreen_regions.remove(&window) {
                client.set_region(PlacementClass::Free(region));
            }
        }

        let (context, workspace) = (client.context(), client.workspace());

        info!("Client {:#x} fullscreen: {}", window, fullscreen);
        self.conn
            .set_window_state(window, WindowState::Fullscreen, fullscreen);

        self.apply_layout(context, workspace);
        self.apply_stack(context, workspace);
    }

    pub(super) fn set_contained(&mut self, window: Window, toggle: Toggle) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        client.set_contained(toggle);
        let (context, workspace) = (client.context(), client.workspace());

        self.apply_layout(context, workspace);
        self.apply_stack(context, workspace);
    }

    pub(super) fn set_sticky(&mut self, window: Window, toggle: Toggle) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        let sticky = toggle.eval(client.is_sticky());
        if sticky == client.is_sticky() {
            return;
        }

        let context = client.context();

        if sticky {
            client.stick();
            self.contexts[context].add_sticky(window);
        } else {
            client.unstick();
            self.contexts[context].remove_sticky(window);
        }

        debug!("WM: Client {:#x} sticky: {}", window, sticky);
        self.conn.set_window_state(window, WindowState::Sticky, sticky);
        self.render_decoration(window);
    }

    pub(super) fn set_urgent(&mut self, window: Window, toggle: Toggle) {
        let Some(client) = self.client_map.get_mut(&window) else {
            return;
        };

        if client.is_focused() {
            return;
        }

        client.set_urgent(toggle);
        let urgent = client.is_urgent();

        self.conn
            .set_window_state(window, WindowState::DemandsAttention, urgent);
        self.render_decoration(window);
    }

    fn kill_focus(&mut self) {
        let Some(window) = self.focus else {
            return;
        };

        if self
            .client_map
            .get(&window)
            .is_some_and(Client::is_invincible)
        {
            debug!("WM: Client {:#x} is invincible", window);
            return;
        }

        info!("Closing client {:#x}", window);
        self.conn.close_window(window);
    }

    // ------------------------------------------------------------------
    // Icons and disowning
    // ------------------------------------------------------------------

    pub(super) fn iconify(&mut self, window: Window) {
        let Some((context, workspace)) = self.location_of(window) else {
            return;
        };

        if !self
            .client_map
            .get(&window)
            .is_some_and(|client| client.is_iconifyable() && !client.is_iconified())
        {
            return;
        }

        let moved = self
            .workspace_mut(context, workspace)
            .is_some_and(|ws| ws.client_to_icon(window));

        if !moved {
            return;
        }

        info!("Iconifying client {:#x}", window);

        if self.focus == Some(window) {
            self.focus = None;
            self.unfocus(window);
        }

        if let Some(client) = self.client_map.get_mut(&window) {
            client.set_iconified(Toggle::On);
        }

        self.unmap_client(window);
        self.conn.set_window_state(window, WindowState::Hidden, true);

        self.apply_layout(context, workspace);
        self.sync_focus();
        self.apply_stack(context, workspace);
    }

    pub(super) fn deiconify(&mut self, window: Window, focus: bool) {
        let Some((context, workspace)) = self.location_of(window) else {
            return;
        };

        let moved = self
            .workspace_mut(context, workspace)
            .is_some_and(|ws| ws.icon_to_client(window));

        if !moved {
            return;
        }

        info!("Deiconifying client {:#x}", window);

        if let Some(client) = self.client_map.get_mut(&window) {
            client.set_iconified(Toggle::Off);
        }

        self.conn.set_window_state(window, WindowState::Hidden, false);
        self.apply_layout(context, workspace);

        if focus {
            self.focus(window);
        }
    }

    fn pop_deiconify(&mut self) {
        let (context, workspace) = self.active_pair();

        if let Some(window) = self.workspace(context, workspace).and_then(Workspace::focused_icon) {
            self.deiconify(window, true);
        }
    }

    pub fn deiconify_all(&mut self, context: Index, workspace: Index) {
        let icons = self
            .workspace(context, workspace)
            .map(Workspace::icons)
            .unwrap_or_default();

        for window in icons {
            self.deiconify(window, false);
        }

        if self.is_visible(context, workspace) {
            self.sync_focus();
            self.apply_stack(context, workspace);
        }
    }

    fn toggle_disown(&mut self) {
        if let Some(window) = self.focus {
            self.disown(window);
            return;
        }

        let (context, workspace) = self.active_pair();
        let last = self
            .workspace(context, workspace)
            .and_then(|ws| ws.disowned().last().copied());

        if let Some(window) = last {
            self.reclaim(window);
        }
    }

    /// Leave a client where it is, outside of the layout and the focus
    /// cycle
    fn disown(&mut self, window: Window) {
        let Some((context, workspace)) = self.location_of(window) else {
            return;
        };

        let moved = self
            .workspace_mut(context, workspace)
            .is_some_and(|ws| ws.client_to_disowned(window));

        if !moved {
            return;
        }

        info!("Disowning client {:#x}", window);

        if self.focus == Some(window) {
            self.focus = None;
            self.unfocus(window);
        }

        if let Some(client) = self.client_map.get_mut(&window) {
            client.disown();
        }

        self.render_decoration(window);
        self.apply_layout(context, workspace);
        self.sync_focus();
        self.apply_stack(context, workspace);
    }

    fn reclaim(&mut self, window: Window) {
        let Some((context, workspace)) = self.location_of(window) else {
            return;
        };

        let moved = self
            .workspace_mut(context, workspace)
            .is_some_and(|ws| ws.disowned_to_client(window));

        if !moved {
            return;
        }

        info!("Reclaiming client {:#x}", window);

        if let Some(client) = self.client_map.get_mut(&window) {
            client.reclaim();
        }

        self.apply_layout(context, workspace);
        self.focus(window);
    }

    // ------------------------------------------------------------------
    // Free geometry
    // ------------------------------------------------------------------

    fn center_client(&mut self, window: Window) {
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

        let region = screen.center_of(client.free_region().dim);
        self.reposition_free(window, region);
    }

    fn nudge_client(&mut self, window: Window, edge: Edge) {
        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        if !self.is_free(client) {
            return;
        }

        let mut region = client.free_region();

        match edge {
            Edge::Left => region.pos.x -= MOVE_STEP,
            Edge::Right => region.pos.x += MOVE_STEP,
            Edge::Top => region.pos.y -= MOVE_STEP,
            Edge::Bottom => region.pos.y += MOVE_STEP,
        }

        self.reposition_free(window, region);
    }

    /// Grow (positive `step`) or shrink a free client on one edge
    fn stretch_client(&mut self, window: Window, edge: Edge, step: i32) {
        let Some(client) = self.client_map.get(&window) else {
            return;
        };

        if !self.is_free(client) {
            return;
        }

        let mut region = client.free_region();
        let extents = client.free_decoration().extents();

        let requested = match edge {
            Edge::Left | Edge::Right => Dim::new(region.dim.w + step, region.dim.h),
            Edge::Top | Edge::Bottom => Dim::new(region.dim.w, region.dim.h + step),
        };

        let inner = constrain_dim(
            Dim::new(
                requested.w - extents.left - extents.right,
                requested.h - extents.top - extents.bottom,
            ),
            client.size_hints().as_ref(),
        );

        let dim = Dim::new(
            inner.w + extents.left + extents.right,
            inner.h + extents.top + extents.bottom,
        );

        match edge {
            Edge::Left => region.pos.x -= dim.w - region.dim.w,
            Edge::Top => region.pos.y -= dim.h - region.dim.h,
            Edge::Right | Edge::Bottom => {}
        }

        region.dim = dim;
        self.reposition_free(window, region);
    }

    // ------------------------------------------------------------------
    // Moving between containers
    // ------------------------------------------------------------------

    pub(super) fn move_client_to_workspace(&mut self, window: Window, to: Index) {
        let Some((context, from)) = self.location_of(window) else {
            return;
        };

        if from == to || to >= self.contexts[context].workspace_count() {
            return;
        }

        info!("Moving client {:#x} to workspace {}", window, to);

        // pinned to the target from now on
        self.set_sticky(window, Toggle::Off);

        if let Some(ws) = self.workspace_mut(context, from) {
            ws.remove_client(window);
        }

        if let Some(ws) = self.workspace_mut(context, to) {
            ws.add_client(window, InsertPos::AfterActive);
        }

        if let Some(client) = self.client_map.get_mut(&window) {
            client.set_workspace(to);
        }

        self.conn.set_window_desktop(window, to);

        if self.focus == Some(window) {
            self.focus = None;
            self.unfocus(window);
        }

        if !self.is_visible(context, to) {
            self.unmap_client(window);
        }

        self.apply_layout(context, from);
        self.apply_layout(context, to);
        self.sync_focus();
        self.apply_active();
    }

    pub(super) fn move_client_to_context(&mut self, window: Window, to: Index) {
        let Some((from, workspace)) = self.location_of(window) else {
            return;
        };

        if from == to || to >= self.contexts.len() {
            return;
        }

        let target_workspace = self.contexts[to].active_workspace();
        info!("Moving client {:#x} to context {}", window, to);

        if let Some(ws) = self.workspace_mut(from, workspace) {
            ws.remove_client(window);
        }

        if let Some(ws) = self.workspace_mut(to, target_workspace) {
            ws.add_client(window, InsertPos::AfterActive);
        }

        let sticky = match self.client_map.get_mut(&window) {
            Some(client) => {
                client.set_context(to);
                client.set_workspace(target_workspace);
                client.is_sticky()
            }
            None => false,
        };

        if sticky {
            self.contexts[from].remove_sticky(window);
            self.contexts[to].add_sticky(window);
        }

        self.conn.set_window_desktop(window, target_workspace);

        if self.focus == Some(window) {
            self.focus = None;
            self.unfocus(window);
        }

        if !self.is_visible(to, target_workspace) {
            self.unmap_client(window);
        }

        self.apply_layout(from, workspace);
        self.apply_layout(to, target_workspace);
        self.sync_focus();
        self.apply_active();
    }

    // ------------------------------------------------------------------
    // External processes
    // ------------------------------------------------------------------

    pub(super) fn spawn(&self, command: &str) {
        info!("Spawning: {}", command);

        let result = Process::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        if let Err(e) = result {
            warn!("Failed to spawn {}: {}", command, e);
        }
    }
}
