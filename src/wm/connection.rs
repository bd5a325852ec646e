//! Connection Module
//!
//! The display-server surface the model drives. The model never talks
//! protocol itself; every side effect goes through this trait, and every
//! query degrades to `None` when the server cannot answer.

use crate::wm::binding::{KeyInput, MouseInput};
use crate::wm::client_flags::{IcccmWindowState, WindowState, WindowType};
use crate::wm::geometry::{Extents, Index, Pid, Pos, Region, Window};
use crate::wm::hints::{Hints, SizeHints};

pub trait Connection {
    /// Top-level windows that existed before the manager started
    fn top_level_windows(&self) -> Vec<Window>;

    /// Regions of the connected outputs, in output order
    fn connected_outputs(&self) -> Vec<Region>;

    // ------------------------------------------------------------------
    // Window lifecycle
    // ------------------------------------------------------------------

    fn create_frame(&mut self, region: Region) -> Window;
    /// Input-only window the pointer is confined to during a move or resize
    fn create_handle(&mut self) -> Window;
    fn init_window(&mut self, window: Window, focus_follows_mouse: bool);
    fn init_frame(&mut self, frame: Window, focus_follows_mouse: bool);
    fn init_unmanaged(&mut self, window: Window);
    fn cleanup_window(&mut self, window: Window);

    fn map_window(&mut self, window: Window);
    fn unmap_window(&mut self, window: Window);
    fn reparent_window(&mut self, window: Window, parent: Window, pos: Pos);
    fn unparent_window(&mut self, window: Window, pos: Pos);
    fn destroy_window(&mut self, window: Window);
    /// Ask the client to close, killing it if it does not speak the
    /// delete protocol; returns false when the window is already gone
    fn close_window(&mut self, window: Window) -> bool;
    fn kill_window(&mut self, window: Window) -> bool;

    fn place_window(&mut self, window: Window, region: &Region);
    fn move_window(&mut self, window: Window, pos: Pos);
    /// Restack `window` directly above `sibling`, or to the bottom when
    /// there is none
    fn stack_window_above(&mut self, window: Window, sibling: Option<Window>);

    // ------------------------------------------------------------------
    // Focus and decoration
    // ------------------------------------------------------------------

    fn focus_window(&mut self, window: Window);
    fn unfocus(&mut self);
    fn get_focused_window(&self) -> Option<Window>;

    fn set_window_border_width(&mut self, window: Window, width: u32);
    fn set_window_border_color(&mut self, window: Window, color: u32);
    fn set_window_background_color(&mut self, window: Window, color: u32);

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn get_window_geometry(&self, window: Window) -> Option<Region>;
    fn get_window_pid(&self, window: Window) -> Option<Pid>;
    fn get_parent_pid(&self, pid: Pid) -> Option<Pid>;

    fn get_icccm_window_name(&self, window: Window) -> String;
    fn get_icccm_window_class(&self, window: Window) -> String;
    fn get_icccm_window_instance(&self, window: Window) -> String;
    fn get_icccm_window_transient_for(&self, window: Window) -> Option<Window>;
    fn get_icccm_window_client_leader(&self, window: Window) -> Option<Window>;
    fn get_icccm_window_hints(&self, window: Window) -> Option<Hints>;
    fn get_icccm_window_size_hints(&self, window: Window) -> Option<SizeHints>;

    fn set_icccm_window_hints(&mut self, window: Window, hints: Hints);
    fn set_icccm_window_state(&mut self, window: Window, state: IcccmWindowState);

    fn get_window_preferred_type(&self, window: Window) -> WindowType;
    fn get_window_preferred_state(&self, window: Window) -> Option<WindowState>;
    fn get_window_strut(&self, window: Window) -> Option<Extents>;

    /// Override-redirect and input-only windows are never managed
    fn must_manage_window(&self, window: Window) -> bool;
    /// Windows whose type asks to be placed freely
    fn must_free_window(&self, window: Window) -> bool;
    fn window_is_fullscreen(&self, window: Window) -> bool;
    fn window_is_sticky(&self, window: Window) -> bool;
    fn window_is_mappable(&self, window: Window) -> bool;

    // ------------------------------------------------------------------
    // EWMH
    // ------------------------------------------------------------------

    fn get_window_desktop(&self, window: Window) -> Option<Index>;
    fn set_window_desktop(&mut self, window: Window, index: Index);
    fn set_window_state(&mut self, window: Window, state: WindowState, on: bool);
    fn set_window_frame_extents(&mut self, window: Window, extents: Extents);

    fn init_wm_properties(&mut self, wm_name: &str, desktop_names: &[String]);
    fn set_current_desktop(&mut self, index: Index);
    fn update_client_list(&mut self, clients: &[Window]);
    fn update_client_list_stacking(&mut self, clients: &[Window]);

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    fn grab_bindings(&mut self, keys: &[KeyInput], mouse: &[MouseInput]);
    fn regrab_buttons(&mut self, window: Window);
    fn ungrab_buttons(&mut self, window: Window);

    fn get_pointer_position(&self) -> Pos;
    fn warp_pointer(&mut self, pos: Pos);
    fn confine_pointer(&mut self, window: Window);
    fn release_pointer(&mut self);

    fn flush(&mut self);

    /// Remove the manager's root properties before exiting
    fn cleanup(&mut self);
}
