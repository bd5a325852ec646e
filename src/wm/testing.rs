//! In-memory display server used by the model tests. It keeps just enough
//! window state to answer queries and records what the model asked for.

use std::collections::{HashMap, HashSet};

use crate::wm::binding::{KeyInput, MouseInput};
use crate::wm::client_flags::{IcccmWindowState, WindowState, WindowType};
use crate::wm::connection::Connection;
use crate::wm::geometry::{Extents, Index, Pid, Pos, Region, Window};
use crate::wm::hints::{Hints, SizeHints};

/// Properties of a window created by a test
#[derive(Debug, Clone, Default)]
pub struct MockWindow {
    pub geometry: Region,
    pub pid: Option<Pid>,
    pub name: String,
    pub class: String,
    pub instance: String,
    pub window_type: WindowType,
    pub state: Option<WindowState>,
    pub transient_for: Option<Window>,
    pub strut: Option<Extents>,
    pub size_hints: Option<SizeHints>,
    pub hints: Option<Hints>,
    pub fullscreen: bool,
    pub desktop: Option<Index>,
}

#[derive(Debug, Default)]
pub struct MockConnection {
    next_id: Window,
    pub outputs: Vec<Region>,
    pub windows: HashMap<Window, MockWindow>,
    pub parent_pids: HashMap<Pid, Pid>,

    pub mapped: HashSet<Window>,
    pub placed: HashMap<Window, Region>,
    pub parents: HashMap<Window, Window>,
    pub focused: Option<Window>,
    pub border_colors: HashMap<Window, u32>,
    pub killed: Vec<Window>,
    pub closed: Vec<Window>,
    pub restacks: Vec<(Window, Option<Window>)>,
    /// Server-side z-order of every restacked window, bottom to top
    pub stack: Vec<Window>,
    pub client_list: Vec<Window>,
    pub client_list_stacking: Vec<Window>,
    pub current_desktop: Option<Index>,
    pub window_desktops: HashMap<Window, Index>,
    pub window_states: HashSet<(Window, WindowState)>,
    pub icccm_states: HashMap<Window, IcccmWindowState>,
    pub pointer: Pos,
    pub confined: Option<Window>,
    pub grabbed_keys: usize,
    pub cleaned_up: bool,
}

impl MockConnection {
    pub fn new(outputs: Vec<Region>) -> Self {
        Self {
            next_id: 0x100,
            outputs,
            ..Self::default()
        }
    }

    fn next_window(&mut self) -> Window {
        self.next_id += 1;
        self.next_id
    }

    /// Create a client-side window and return its id
    pub fn add_window(&mut self, window: MockWindow) -> Window {
        let id = self.next_window();
        self.windows.insert(id, window);
        id
    }

    pub fn is_mapped(&self, window: Window) -> bool {
        self.mapped.contains(&window)
    }
}

impl Connection for MockConnection {
    fn top_level_windows(&self) -> Vec<Window> {
        let mut windows: Vec<Window> = self
            .windows
            .keys()
            .copied()
            .filter(|window| self.mapped.contains(window))
            .collect();

        windows.sort_unstable();
        windows
    }

    fn connected_outputs(&self) -> Vec<Region> {
        self.outputs.clone()
    }

    fn create_frame(&mut self, region: Region) -> Window {
        let frame = self.next_window();
        self.placed.insert(frame, region);
        frame
    }

    fn create_handle(&mut self) -> Window {
        self.next_window()
    }

    fn init_window(&mut self, _window: Window, _focus_follows_mouse: bool) {}

    fn init_frame(&mut self, _frame: Window, _focus_follows_mouse: bool) {}

    fn init_unmanaged(&mut self, _window: Window) {}

    fn cleanup_window(&mut self, _window: Window) {}

    fn map_window(&mut self, window: Window) {
        self.mapped.insert(window);
    }

    fn unmap_window(&mut self, window: Window) {
        self.mapped.remove(&window);
    }

    fn reparent_window(&mut self, window: Window, parent: Window, _pos: Pos) {
        self.parents.insert(window, parent);
    }

    fn unparent_window(&mut self, window: Window, _pos: Pos) {
        self.parents.remove(&window);
    }

    fn destroy_window(&mut self, window: Window) {
        self.mapped.remove(&window);
        self.placed.remove(&window);
        self.stack.retain(|&w| w != window);
    }

    fn close_window(&mut self, window: Window) -> bool {
        self.closed.push(window);
        true
    }

    fn kill_window(&mut self, window: Window) -> bool {
        self.killed.push(window);
        true
    }

    fn place_window(&mut self, window: Window, region: &Region) {
        self.placed.insert(window, *region);
    }

    fn move_window(&mut self, window: Window, pos: Pos) {
        if let Some(region) = self.placed.get_mut(&window) {
            region.pos = pos;
        }
    }

    fn stack_window_above(&mut self, window: Window, sibling: Option<Window>) {
        self.restacks.push((window, sibling));
        self.stack.retain(|&w| w != window);

        let index = sibling
            .and_then(|sibling| self.stack.iter().position(|&w| w == sibling))
            .map_or(0, |index| index + 1);

        self.stack.insert(index, window);
    }

    fn focus_window(&mut self, window: Window) {
        self.focused = Some(window);
    }

    fn unfocus(&mut self) {
        self.focused = None;
    }

    fn get_focused_window(&self) -> Option<Window> {
        self.focused
    }

    fn set_window_border_width(&mut self, _window: Window, _width: u32) {}

    fn set_window_border_color(&mut self, window: Window, color: u32) {
        self.border_colors.insert(window, color);
    }

    fn set_window_background_color(&mut self, _window: Window, _color: u32) {}

    fn get_window_geometry(&self, window: Window) -> Option<Region> {
        self.windows
            .get(&window)
            .map(|window| window.geometry)
            .or_else(|| self.placed.get(&window).copied())
    }

    fn get_window_pid(&self, window: Window) -> Option<Pid> {
        self.windows.get(&window).and_then(|window| window.pid)
    }

    fn get_parent_pid(&self, pid: Pid) -> Option<Pid> {
        self.parent_pids.get(&pid).copied()
    }

    fn get_icccm_window_name(&self, window: Window) -> String {
        self.windows
            .get(&window)
            .map(|window| window.name.clone())
            .unwrap_or_default()
    }

    fn get_icccm_window_class(&self, window: Window) -> String {
        self.windows
            .get(&window)
            .map(|window| window.class.clone())
            .unwrap_or_default()
    }

    fn get_icccm_window_instance(&self, window: Window) -> String {
        self.windows
            .get(&window)
            .map(|window| window.instance.clone())
            .unwrap_or_default()
    }

    fn get_icccm_window_transient_for(&self, window: Window) -> Option<Window> {
        self.windows.get(&window).and_then(|window| window.transient_for)
    }

    fn get_icccm_window_client_leader(&self, _window: Window) -> Option<Window> {
        None
    }

    fn get_icccm_window_hints(&self, window: Window) -> Option<Hints> {
        self.windows.get(&window).and_then(|window| window.hints)
    }

    fn get_icccm_window_size_hints(&self, window: Window) -> Option<SizeHints> {
        self.windows.get(&window).and_then(|window| window.size_hints)
    }

    fn set_icccm_window_hints(&mut self, window: Window, hints: Hints) {
        if let Some(window) = self.windows.get_mut(&window) {
            window.hints = Some(hints);
        }
    }

    fn set_icccm_window_state(&mut self, window: Window, state: IcccmWindowState) {
        self.icccm_states.insert(window, state);
    }

    fn get_window_preferred_type(&self, window: Window) -> WindowType {
        self.windows
            .get(&window)
            .map(|window| window.window_type)
            .unwrap_or_default()
    }

    fn get_window_preferred_state(&self, window: Window) -> Option<WindowState> {
        self.windows.get(&window).and_then(|window| window.state)
    }

    fn get_window_strut(&self, window: Window) -> Option<Extents> {
        self.windows.get(&window).and_then(|window| window.strut)
    }

    fn must_manage_window(&self, window: Window) -> bool {
        self.windows.contains_key(&window)
    }

    fn must_free_window(&self, window: Window) -> bool {
        self.windows.get(&window).is_some_and(|window| {
            matches!(
                window.window_type,
                WindowType::Dialog | WindowType::Utility | WindowType::Toolbar | WindowType::Splash
            )
        })
    }

    fn window_is_fullscreen(&self, window: Window) -> bool {
        self.windows.get(&window).is_some_and(|window| window.fullscreen)
    }

    fn window_is_sticky(&self, window: Window) -> bool {
        self.windows
            .get(&window)
            .is_some_and(|window| window.state == Some(WindowState::Sticky))
    }

    fn window_is_mappable(&self, window: Window) -> bool {
        self.windows.contains_key(&window)
    }

    fn get_window_desktop(&self, window: Window) -> Option<Index> {
        self.windows.get(&window).and_then(|window| window.desktop)
    }

    fn set_window_desktop(&mut self, window: Window, index: Index) {
        self.window_desktops.insert(window, index);
    }

    fn set_window_state(&mut self, window: Window, state: WindowState, on: bool) {
        if on {
            self.window_states.insert((window, state));
        } else {
            self.window_states.remove(&(window, state));
        }
    }

    fn set_window_frame_extents(&mut self, _window: Window, _extents: Extents) {}

    fn init_wm_properties(&mut self, _wm_name: &str, _desktop_names: &[String]) {}

    fn set_current_desktop(&mut self, index: Index) {
        self.current_desktop = Some(index);
    }

    fn update_client_list(&mut self, clients: &[Window]) {
        self.client_list = clients.to_vec();
    }

    fn update_client_list_stacking(&mut self, clients: &[Window]) {
        self.client_list_stacking = clients.to_vec();
    }

    fn grab_bindings(&mut self, keys: &[KeyInput], _mouse: &[MouseInput]) {
        self.grabbed_keys = keys.len();
    }

    fn regrab_buttons(&mut self, _window: Window) {}

    fn ungrab_buttons(&mut self, _window: Window) {}

    fn get_pointer_position(&self) -> Pos {
        self.pointer
    }

    fn warp_pointer(&mut self, pos: Pos) {
        self.pointer = pos;
    }

    fn confine_pointer(&mut self, window: Window) {
        self.confined = Some(window);
    }

    fn release_pointer(&mut self) {
        self.confined = None;
    }

    fn flush(&mut self) {}

    fn cleanup(&mut self) {
        self.cleaned_up = true;
    }
}
