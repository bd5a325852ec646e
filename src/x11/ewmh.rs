//! EWMH (Extended Window Manager Hints) and ICCCM atoms
//!
//! Interned once at startup; helpers here only read and write the
//! properties, they never decide anything.

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ClientMessageEvent, *};
use x11rb::wrapper::ConnectionExt as _;

use crate::wm::client_flags::{WindowState, WindowType};

/// Holds all interned atoms
#[derive(Debug)]
pub struct Atoms {
    pub net_supported: Atom,
    pub net_client_list: Atom,
    pub net_client_list_stacking: Atom,
    pub net_number_of_desktops: Atom,
    pub net_current_desktop: Atom,
    pub net_desktop_names: Atom,
    pub net_active_window: Atom,
    pub net_close_window: Atom,
    pub net_moveresize_window: Atom,
    pub net_wm_moveresize: Atom,
    pub net_restack_window: Atom,
    pub net_request_frame_extents: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_wm_name: Atom,
    pub net_wm_desktop: Atom,
    pub net_wm_pid: Atom,
    pub net_wm_strut: Atom,
    pub net_wm_strut_partial: Atom,
    pub net_frame_extents: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_desktop: Atom,
    pub net_wm_window_type_dock: Atom,
    pub net_wm_window_type_toolbar: Atom,
    pub net_wm_window_type_menu: Atom,
    pub net_wm_window_type_utility: Atom,
    pub net_wm_window_type_splash: Atom,
    pub net_wm_window_type_dialog: Atom,
    pub net_wm_window_type_dropdown_menu: Atom,
    pub net_wm_window_type_popup_menu: Atom,
    pub net_wm_window_type_tooltip: Atom,
    pub net_wm_window_type_notification: Atom,
    pub net_wm_window_type_combo: Atom,
    pub net_wm_window_type_dnd: Atom,
    pub net_wm_window_type_normal: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_modal: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_shaded: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_wm_state_skip_pager: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_state_below: Atom,
    pub net_wm_state_demands_attention: Atom,
    // ICCCM
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub wm_client_leader: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn
                .intern_atom(false, name.as_bytes())?
                .reply()
                .with_context(|| format!("Failed to intern {}", name))?
                .atom)
        };

        Ok(Self {
            net_supported: intern("_NET_SUPPORTED")?,
            net_client_list: intern("_NET_CLIENT_LIST")?,
            net_client_list_stacking: intern("_NET_CLIENT_LIST_STACKING")?,
            net_number_of_desktops: intern("_NET_NUMBER_OF_DESKTOPS")?,
            net_current_desktop: intern("_NET_CURRENT_DESKTOP")?,
            net_desktop_names: intern("_NET_DESKTOP_NAMES")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_close_window: intern("_NET_CLOSE_WINDOW")?,
            net_moveresize_window: intern("_NET_MOVERESIZE_WINDOW")?,
            net_wm_moveresize: intern("_NET_WM_MOVERESIZE")?,
            net_restack_window: intern("_NET_RESTACK_WINDOW")?,
            net_request_frame_extents: intern("_NET_REQUEST_FRAME_EXTENTS")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_desktop: intern("_NET_WM_DESKTOP")?,
            net_wm_pid: intern("_NET_WM_PID")?,
            net_wm_strut: intern("_NET_WM_STRUT")?,
            net_wm_strut_partial: intern("_NET_WM_STRUT_PARTIAL")?,
            net_frame_extents: intern("_NET_FRAME_EXTENTS")?,
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_desktop: intern("_NET_WM_WINDOW_TYPE_DESKTOP")?,
            net_wm_window_type_dock: intern("_NET_WM_WINDOW_TYPE_DOCK")?,
            net_wm_window_type_toolbar: intern("_NET_WM_WINDOW_TYPE_TOOLBAR")?,
            net_wm_window_type_menu: intern("_NET_WM_WINDOW_TYPE_MENU")?,
            net_wm_window_type_utility: intern("_NET_WM_WINDOW_TYPE_UTILITY")?,
            net_wm_window_type_splash: intern("_NET_WM_WINDOW_TYPE_SPLASH")?,
            net_wm_window_type_dialog: intern("_NET_WM_WINDOW_TYPE_DIALOG")?,
            net_wm_window_type_dropdown_menu: intern("_NET_WM_WINDOW_TYPE_DROPDOWN_MENU")?,
            net_wm_window_type_popup_menu: intern("_NET_WM_WINDOW_TYPE_POPUP_MENU")?,
            net_wm_window_type_tooltip: intern("_NET_WM_WINDOW_TYPE_TOOLTIP")?,
            net_wm_window_type_notification: intern("_NET_WM_WINDOW_TYPE_NOTIFICATION")?,
            net_wm_window_type_combo: intern("_NET_WM_WINDOW_TYPE_COMBO")?,
            net_wm_window_type_dnd: intern("_NET_WM_WINDOW_TYPE_DND")?,
            net_wm_window_type_normal: intern("_NET_WM_WINDOW_TYPE_NORMAL")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_modal: intern("_NET_WM_STATE_MODAL")?,
            net_wm_state_sticky: intern("_NET_WM_STATE_STICKY")?,
            net_wm_state_maximized_vert: intern("_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_maximized_horz: intern("_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_state_shaded: intern("_NET_WM_STATE_SHADED")?,
            net_wm_state_skip_taskbar: intern("_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_state_skip_pager: intern("_NET_WM_STATE_SKIP_PAGER")?,
            net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            net_wm_state_above: intern("_NET_WM_STATE_ABOVE")?,
            net_wm_state_below: intern("_NET_WM_STATE_BELOW")?,
            net_wm_state_demands_attention: intern("_NET_WM_STATE_DEMANDS_ATTENTION")?,
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            wm_state: intern("WM_STATE")?,
            wm_change_state: intern("WM_CHANGE_STATE")?,
            wm_client_leader: intern("WM_CLIENT_LEADER")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }

    /// Set up _NET_SUPPORTED on root window
    pub fn setup_supported<C: Connection>(&self, conn: &C, root: Window) -> Result<()> {
        let supported = [
            self.net_supported,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_number_of_desktops,
            self.net_current_desktop,
            self.net_desktop_names,
            self.net_active_window,
            self.net_close_window,
            self.net_moveresize_window,
            self.net_wm_moveresize,
            self.net_restack_window,
            self.net_request_frame_extents,
            self.net_supporting_wm_check,
            self.net_wm_name,
            self.net_wm_desktop,
            self.net_wm_pid,
            self.net_wm_strut,
            self.net_wm_strut_partial,
            self.net_frame_extents,
            self.net_wm_window_type,
            self.net_wm_window_type_desktop,
            self.net_wm_window_type_dock,
            self.net_wm_window_type_toolbar,
            self.net_wm_window_type_menu,
            self.net_wm_window_type_utility,
            self.net_wm_window_type_splash,
            self.net_wm_window_type_dialog,
            self.net_wm_window_type_dropdown_menu,
            self.net_wm_window_type_popup_menu,
            self.net_wm_window_type_tooltip,
            self.net_wm_window_type_notification,
            self.net_wm_window_type_combo,
            self.net_wm_window_type_dnd,
            self.net_wm_window_type_normal,
            self.net_wm_state,
            self.net_wm_state_sticky,
            self.net_wm_state_hidden,
            self.net_wm_state_fullscreen,
            self.net_wm_state_above,
            self.net_wm_state_below,
            self.net_wm_state_demands_attention,
        ];

        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_supported,
            AtomEnum::ATOM,
            &supported,
        )?;

        Ok(())
    }

    /// Root properties this manager owns, removed again on exit
    pub fn root_properties(&self) -> [Atom; 8] {
        [
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_number_of_desktops,
            self.net_current_desktop,
            self.net_desktop_names,
            self.net_active_window,
        ]
    }

    pub fn window_type(&self, atom: Atom) -> Option<WindowType> {
        let window_type = match atom {
            a if a == self.net_wm_window_type_desktop => WindowType::Desktop,
            a if a == self.net_wm_window_type_dock => WindowType::Dock,
            a if a == self.net_wm_window_type_toolbar => WindowType::Toolbar,
            a if a == self.net_wm_window_type_menu => WindowType::Menu,
            a if a == self.net_wm_window_type_utility => WindowType::Utility,
            a if a == self.net_wm_window_type_splash => WindowType::Splash,
            a if a == self.net_wm_window_type_dialog => WindowType::Dialog,
            a if a == self.net_wm_window_type_dropdown_menu => WindowType::DropdownMenu,
            a if a == self.net_wm_window_type_popup_menu => WindowType::PopupMenu,
            a if a == self.net_wm_window_type_tooltip => WindowType::Tooltip,
            a if a == self.net_wm_window_type_notification => WindowType::Notification,
            a if a == self.net_wm_window_type_combo => WindowType::Combo,
            a if a == self.net_wm_window_type_dnd => WindowType::Dnd,
            a if a == self.net_wm_window_type_normal => WindowType::Normal,
            _ => return None,
        };

        Some(window_type)
    }

    pub fn window_state(&self, atom: Atom) -> Option<WindowState> {
        let state = match atom {
            a if a == self.net_wm_state_modal => WindowState::Modal,
            a if a == self.net_wm_state_sticky => WindowState::Sticky,
            a if a == self.net_wm_state_maximized_vert => WindowState::MaximizedVert,
            a if a == self.net_wm_state_maximized_horz => WindowState::MaximizedHorz,
            a if a == self.net_wm_state_shaded => WindowState::Shaded,
            a if a == self.net_wm_state_skip_taskbar => WindowState::SkipTaskbar,
            a if a == self.net_wm_state_skip_pager => WindowState::SkipPager,
            a if a == self.net_wm_state_hidden => WindowState::Hidden,
            a if a == self.net_wm_state_fullscreen => WindowState::Fullscreen,
            a if a == self.net_wm_state_above => WindowState::Above,
            a if a == self.net_wm_state_below => WindowState::Below,
            a if a == self.net_wm_state_demands_attention => WindowState::DemandsAttention,
            _ => return None,
        };

        Some(state)
    }

    pub fn state_atom(&self, state: WindowState) -> Atom {
        match state {
            WindowState::Modal => self.net_wm_state_modal,
            WindowState::Sticky => self.net_wm_state_sticky,
            WindowState::MaximizedVert => self.net_wm_state_maximized_vert,
            WindowState::MaximizedHorz => self.net_wm_state_maximized_horz,
            WindowState::Shaded => self.net_wm_state_shaded,
            WindowState::SkipTaskbar => self.net_wm_state_skip_taskbar,
            WindowState::SkipPager => self.net_wm_state_skip_pager,
            WindowState::Hidden => self.net_wm_state_hidden,
            WindowState::Fullscreen => self.net_wm_state_fullscreen,
            WindowState::Above => self.net_wm_state_above,
            WindowState::Below => self.net_wm_state_below,
            WindowState::DemandsAttention => self.net_wm_state_demands_attention,
        }
    }

    /// Read a list of 32-bit values, empty when the property is absent
    pub fn get_property32<C: Connection>(
        conn: &C,
        window: Window,
        property: Atom,
        type_: impl Into<Atom>,
        length: u32,
    ) -> Result<Vec<u32>> {
        let reply = conn
            .get_property(false, window, property, type_, 0, length)?
            .reply()?;

        Ok(reply.value32().map(|values| values.collect()).unwrap_or_default())
    }

    /// Add or remove one atom from _NET_WM_STATE
    pub fn set_window_state<C: Connection>(
        &self,
        conn: &C,
        window: Window,
        state: WindowState,
        on: bool,
    ) -> Result<()> {
        let atom = self.state_atom(state);
        let mut states = Self::get_property32(conn, window, self.net_wm_state, AtomEnum::ATOM, 1024)?;

        states.retain(|&a| a != atom);
        if on {
            states.push(atom);
        }

        conn.change_property32(
            PropMode::REPLACE,
            window,
            self.net_wm_state,
            AtomEnum::ATOM,
            &states,
        )?;

        Ok(())
    }

    pub fn supports_protocol<C: Connection>(
        &self,
        conn: &C,
        window: Window,
        protocol: Atom,
    ) -> Result<bool> {
        let protocols =
            Self::get_property32(conn, window, self.wm_protocols, AtomEnum::ATOM, 1024)?;
        Ok(protocols.contains(&protocol))
    }

    /// Send a WM_PROTOCOLS client message (WM_DELETE_WINDOW, WM_TAKE_FOCUS)
    pub fn send_protocol<C: Connection>(
        &self,
        conn: &C,
        window: Window,
        protocol: Atom,
    ) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.wm_protocols,
            [protocol, x11rb::CURRENT_TIME, 0, 0, 0],
        );

        if let Err(e) = conn.send_event(false, window, EventMask::NO_EVENT, event) {
            debug!("Failed to send protocol message to {:#x}: {}", window, e);
        }

        Ok(())
    }

    /// Update _NET_ACTIVE_WINDOW
    pub fn update_active_window<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        window: Option<Window>,
    ) -> Result<()> {
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_active_window,
            AtomEnum::WINDOW,
            &[window.unwrap_or(x11rb::NONE)],
        )?;
        Ok(())
    }

    /// Update _NET_CLIENT_LIST or _NET_CLIENT_LIST_STACKING
    pub fn update_client_list<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        property: Atom,
        windows: &[Window],
    ) -> Result<()> {
        conn.change_property32(PropMode::REPLACE, root, property, AtomEnum::WINDOW, windows)?;
        Ok(())
    }

    /// Update _NET_FRAME_EXTENTS for a window
    pub fn update_frame_extents<C: Connection>(
        &self,
        conn: &C,
        window: Window,
        left: u32,
        right: u32,
        top: u32,
        bottom: u32,
    ) -> Result<()> {
        conn.change_property32(
            PropMode::REPLACE,
            window,
            self.net_frame_extents,
            AtomEnum::CARDINAL,
            &[left, right, top, bottom],
        )?;
        Ok(())
    }

    /// Set _NET_DESKTOP_NAMES as a list of NUL-terminated UTF-8 strings
    pub fn update_desktop_names<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        names: &[String],
    ) -> Result<()> {
        let mut data = Vec::new();
        for name in names {
            data.extend_from_slice(name.as_bytes());
            data.push(0);
        }

        conn.change_property8(
            PropMode::REPLACE,
            root,
            self.net_desktop_names,
            self.utf8_string,
            &data,
        )?;
        Ok(())
    }
}
