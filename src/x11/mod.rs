//! X11 Display Adapter
//!
//! `X11Connection` speaks the X protocol through x11rb on behalf of the
//! model. Requests are fire-and-forget; failures of individual requests
//! are logged, and queries degrade to `None` or defaults.

pub mod ewmh;
pub mod keysym;

use std::collections::VecDeque;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, trace, warn};
use x11rb::connection::{Connection as _, RequestConnection as _};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    self, AtomEnum, ButtonIndex, ButtonPressEvent, ChangeWindowAttributesAux, ClientMessageEvent,
    ConfigWindow, ConfigureRequestEvent, ConfigureWindowAux, ConnectionExt as _, CreateWindowAux,
    EventMask, GrabMode, InputFocus, MapState, ModMask, MotionNotifyEvent, NotifyMode,
    PropertyNotifyEvent, SetMode, WindowClass,
};
use x11rb::protocol::Event as XEvent;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::wm::binding::{Button, KeyInput, Modifiers, MouseInput, MouseInputTarget};
use crate::wm::client::Client;
use crate::wm::client_flags::{IcccmWindowState, ToggleAction, WindowState, WindowType};
use crate::wm::connection::Connection;
use crate::wm::event::{Event, MouseEvent, MouseEventKind, PropertyKind, StackMode as RestackMode};
use crate::wm::geometry::{Corner, Dim, Edge, Extents, Index, Pid, Pos, Region, Window};
use crate::wm::hints::{Hints, SizeHints};
use crate::wm::moveresize::Grip;

use ewmh::Atoms;
use keysym::KeyMap;

/// _NET_WM_DESKTOP value of windows shown on every desktop
const ALL_DESKTOPS: u32 = 0xffff_ffff;

/// Lock and NumLock combinations every grab is repeated for
const IGNORED_MODIFIERS: [u16; 4] = [0, 1 << 1, 1 << 4, (1 << 1) | (1 << 4)];

const PROPERTY_LENGTH: u32 = 1024;

pub struct X11Connection {
    conn: RustConnection,
    root: Window,
    root_region: Region,
    /// Owns the WM_S<n> selection; referenced by _NET_SUPPORTING_WM_CHECK
    check_window: Window,
    atoms: Atoms,
    keymap: KeyMap,
    has_randr: bool,
    key_inputs: Vec<KeyInput>,
    client_mouse_inputs: Vec<MouseInput>,
    confined: Option<Window>,
    pending: VecDeque<Event>,
}

/// Log a request that could not be sent; the model never waits on them
fn sent<T, E: std::fmt::Display>(result: Result<T, E>) {
    if let Err(e) = result {
        warn!("X11: request failed: {}", e);
    }
}

fn coord(value: i32) -> i16 {
    value.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

fn extent(value: i32) -> u16 {
    value.clamp(1, u16::MAX.into()) as u16
}

impl X11Connection {
    /// Connect to the display and become its window manager
    pub fn new(replace: bool) -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).context("Failed to connect to the X server")?;

        info!("Initializing window manager (replace={})", replace);

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let root_depth = screen.root_depth;
        let root_region = Region::new(
            0,
            0,
            screen.width_in_pixels.into(),
            screen.height_in_pixels.into(),
        );

        // Step 1: Intern WM selection atom (ICCCM: WM_S{screen_num})
        let selection_name = format!("WM_S{}", screen_num);
        debug!("WM: Interning selection atom '{}'", selection_name);
        let selection = conn
            .intern_atom(false, selection_name.as_bytes())?
            .reply()
            .context("Failed to intern WM selection atom")?
            .atom;

        // Step 2: Check for an existing WM
        let previous_owner = conn
            .get_selection_owner(selection)?
            .reply()
            .context("Failed to get current WM selection owner")?
            .owner;
        debug!("WM: Current selection owner: {:#x}", previous_owner);

        if previous_owner != NONE {
            if !replace {
                anyhow::bail!(
                    "Another window manager is already running (window {:#x}). \
                     Use --replace to attempt to replace it.",
                    previous_owner
                );
            }

            info!("Existing WM detected (window {:#x}), attempting replace...", previous_owner);
            sent(conn.change_window_attributes(
                previous_owner,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
            ));
            conn.flush()?;
        }

        // Step 3: Create the check window, which owns the selection
        let check_window = conn.generate_id()?;
        conn.create_window(
            root_depth,
            check_window,
            root,
            -1000,
            -1000,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new()
                .override_redirect(1)
                .event_mask(EventMask::STRUCTURE_NOTIFY),
        )?;
        conn.map_window(check_window)?;
        debug!("WM: Created check window {:#x}", check_window);

        // Step 4: Acquire WM selection ownership
        conn.set_selection_owner(check_window, selection, CURRENT_TIME)?
            .check()
            .context("Failed to set WM selection owner")?;

        let owner = conn
            .get_selection_owner(selection)?
            .reply()
            .context("Failed to verify WM selection ownership")?
            .owner;

        if owner != check_window {
            anyhow::bail!(
                "Failed to acquire WM selection ownership (expected {:#x}, got {:#x})",
                check_window,
                owner
            );
        }

        // Step 5: If replacing, wait for the previous WM to exit
        if previous_owner != NONE {
            info!("Waiting for previous WM to exit...");
            let timeout = Duration::from_secs(15);
            let start = Instant::now();

            while start.elapsed() < timeout {
                if conn.get_window_attributes(previous_owner)?.reply().is_err() {
                    break;
                }

                conn.flush()?;
                std::thread::sleep(Duration::from_millis(100));
            }

            if start.elapsed() >= timeout {
                warn!("Timeout waiting for previous WM to exit, proceeding anyway");
            } else {
                info!("Previous WM exited");
            }
        }

        // Step 6: Select events on root window
        let root_mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::POINTER_MOTION
            | EventMask::PROPERTY_CHANGE
            | EventMask::FOCUS_CHANGE;

        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(root_mask))?
            .check()
            .context("Failed to select events on root window - is another WM running?")?;

        // Step 7: Screen change notifications
        let has_randr = conn
            .extension_information(randr::X11_EXTENSION_NAME)?
            .is_some();

        if has_randr {
            sent(conn.randr_select_input(root, randr::NotifyMask::SCREEN_CHANGE));
        } else {
            warn!("RandR unavailable; treating the root window as the only output");
        }

        // Step 8: Initialize atoms and _NET_SUPPORTING_WM_CHECK
        let atoms = Atoms::new(&conn)?;
        atoms.setup_supported(&conn, root)?;

        for window in [root, check_window] {
            conn.change_property32(
                xproto::PropMode::REPLACE,
                window,
                atoms.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[check_window],
            )?;
        }

        let keymap = KeyMap::load(&conn)?;
        conn.flush()?;

        info!("Successfully became window manager");

        Ok(Self {
            conn,
            root,
            root_region,
            check_window,
            atoms,
            keymap,
            has_randr,
            key_inputs: Vec::new(),
            client_mouse_inputs: Vec::new(),
            confined: None,
            pending: VecDeque::new(),
        })
    }

    /// File descriptor of the display connection, for polling
    pub fn raw_fd(&self) -> RawFd {
        self.conn.stream().as_raw_fd()
    }

    /// Non-blocking: the next model event, or `None` once the queue is
    /// drained
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            match self.conn.poll_for_event()? {
                Some(raw) => self.translate(raw),
                None => return Ok(None),
            }
        }
    }

    // ------------------------------------------------------------------
    // Event translation
    // ------------------------------------------------------------------

    fn translate(&mut self, raw: XEvent) {
        trace!("X11: {:?}", raw);

        match raw {
            XEvent::ButtonPress(e) => self.on_button(e, MouseEventKind::Press),
            XEvent::ButtonRelease(e) => self.on_button(e, MouseEventKind::Release),
            XEvent::MotionNotify(e) => self.on_motion(e),
            XEvent::KeyPress(e) => {
                if let Some(key) = self.keymap.name(e.detail) {
                    let modifiers = Modifiers::from_bits_truncate(u16::from(e.state));
                    self.pending.push_back(Event::Key {
                        input: KeyInput::new(key, modifiers),
                    });
                }
            }
            XEvent::MapRequest(e) => self.pending.push_back(Event::MapRequest {
                window: e.window,
                ignore: false,
            }),
            XEvent::MapNotify(e) => self.pending.push_back(Event::Map {
                window: e.window,
                ignore: e.override_redirect,
            }),
            XEvent::EnterNotify(e) if e.mode == NotifyMode::NORMAL => {
                self.pending.push_back(Event::Enter {
                    window: e.event,
                    root_rpos: Pos::new(e.root_x.into(), e.root_y.into()),
                    window_rpos: Pos::new(e.event_x.into(), e.event_y.into()),
                })
            }
            XEvent::LeaveNotify(e) if e.mode == NotifyMode::NORMAL => {
                self.pending.push_back(Event::Leave {
                    window: e.event,
                    root_rpos: Pos::new(e.root_x.into(), e.root_y.into()),
                    window_rpos: Pos::new(e.event_x.into(), e.event_y.into()),
                })
            }
            XEvent::DestroyNotify(e) => self.pending.push_back(Event::Destroy { window: e.window }),
            XEvent::Expose(e) if e.count == 0 => {
                self.pending.push_back(Event::Expose { window: e.window })
            }
            XEvent::UnmapNotify(e) => self.pending.push_back(Event::Unmap {
                window: e.window,
                ignore: e.from_configure,
            }),
            XEvent::ConfigureRequest(e) => self.on_configure_request(e),
            XEvent::ConfigureNotify(e) => {
                let on_root = e.window == self.root;
                let region = Region::new(
                    e.x.into(),
                    e.y.into(),
                    e.width.into(),
                    e.height.into(),
                );

                if on_root {
                    self.root_region = region;
                }

                self.pending.push_back(Event::Configure {
                    window: e.window,
                    region,
                    on_root,
                });
            }
            XEvent::PropertyNotify(e) => self.on_property(e),
            XEvent::ClientMessage(e) => self.on_client_message(e),
            XEvent::MappingNotify(_) => match KeyMap::load(&self.conn) {
                Ok(keymap) => {
                    self.keymap = keymap;
                    self.grab_keys();
                }
                Err(e) => warn!("Failed to reload keyboard mapping: {:#}", e),
            },
            XEvent::RandrScreenChangeNotify(_) => self.pending.push_back(Event::ScreenChange),
            XEvent::Error(e) => debug!("X11: error {:?}", e),
            _ => {}
        }
    }

    fn on_button(&mut self, e: ButtonPressEvent, kind: MouseEventKind) {
        let on_root = e.event == self.root;

        if kind == MouseEventKind::Press && !on_root {
            // let the click through to the client
            sent(self.conn.allow_events(xproto::Allow::REPLAY_POINTER, e.time));
        }

        let Some(button) = button_from_detail(e.detail) else {
            return;
        };

        let window = if on_root {
            (e.child != NONE).then_some(e.child)
        } else {
            Some(e.event)
        };

        let target = if on_root {
            MouseInputTarget::Root
        } else {
            MouseInputTarget::Client
        };

        self.pending.push_back(Event::Mouse {
            event: MouseEvent {
                kind,
                input: MouseInput::new(
                    target,
                    button,
                    Modifiers::from_bits_truncate(u16::from(e.state)),
                ),
                window,
                root_rpos: Pos::new(e.root_x.into(), e.root_y.into()),
            },
            on_root,
        });
    }

    fn on_motion(&mut self, e: MotionNotifyEvent) {
        let on_root = e.event == self.root;

        self.pending.push_back(Event::Mouse {
            event: MouseEvent {
                kind: MouseEventKind::Motion,
                input: MouseInput::new(
                    MouseInputTarget::Client,
                    Button::Left,
                    Modifiers::from_bits_truncate(u16::from(e.state)),
                ),
                window: Some(e.event),
                root_rpos: Pos::new(e.root_x.into(), e.root_y.into()),
            },
            on_root,
        });
    }

    fn on_configure_request(&mut self, e: ConfigureRequestEvent) {
        let on_root = e.parent == self.root;
        let mask = e.value_mask;

        if mask.contains(ConfigWindow::SIBLING) && mask.contains(ConfigWindow::STACK_MODE) {
            let mode = match e.stack_mode {
                xproto::StackMode::ABOVE => Some(RestackMode::Above),
                xproto::StackMode::BELOW => Some(RestackMode::Below),
                _ => None,
            };

            if let Some(mode) = mode {
                self.pending.push_back(Event::RestackRequest {
                    window: e.window,
                    sibling: e.sibling,
                    mode,
                    on_root,
                });
            }
        }

        let pos = (mask.contains(ConfigWindow::X) || mask.contains(ConfigWindow::Y))
            .then(|| Pos::new(e.x.into(), e.y.into()));

        let dim = (mask.contains(ConfigWindow::WIDTH) || mask.contains(ConfigWindow::HEIGHT))
            .then(|| Dim::new(e.width.into(), e.height.into()));

        self.pending.push_back(Event::PlacementRequest {
            window: e.window,
            pos,
            dim,
            on_root,
        });
    }

    fn on_property(&mut self, e: PropertyNotifyEvent) {
        let atoms = &self.atoms;

        let kind = match e.atom {
            a if a == u32::from(AtomEnum::WM_NAME) || a == atoms.net_wm_name => PropertyKind::Name,
            a if a == u32::from(AtomEnum::WM_CLASS) => PropertyKind::Class,
            a if a == u32::from(AtomEnum::WM_NORMAL_HINTS) => PropertyKind::Size,
            a if a == u32::from(AtomEnum::WM_HINTS) => PropertyKind::Hints,
            a if a == atoms.net_wm_strut || a == atoms.net_wm_strut_partial => PropertyKind::Strut,
            _ => return,
        };

        self.pending.push_back(Event::Property {
            window: e.window,
            kind,
            on_root: e.window == self.root,
        });
    }

    fn on_client_message(&mut self, e: ClientMessageEvent) {
        let data = e.data.as_data32();
        let window = e.window;
        let on_root = window == self.root;
        let atoms = &self.atoms;

        match e.type_ {
            t if t == atoms.net_wm_state => {
                let Some(action) = state_action(data[0]) else {
                    return;
                };

                for atom in [data[1], data[2]] {
                    if let Some(state) = atoms.window_state(atom) {
                        self.pending.push_back(Event::StateRequest {
                            window,
                            state,
                            action,
                            on_root,
                        });
                    }
                }
            }
            t if t == atoms.net_active_window => {
                self.pending.push_back(Event::FocusRequest { window, on_root })
            }
            t if t == atoms.net_close_window => {
                self.pending.push_back(Event::CloseRequest { window, on_root })
            }
            t if t == atoms.net_wm_desktop => {
                if data[0] == ALL_DESKTOPS {
                    self.pending.push_back(Event::StateRequest {
                        window,
                        state: WindowState::Sticky,
                        action: ToggleAction::Add,
                        on_root,
                    });
                } else {
                    self.pending.push_back(Event::WorkspaceRequest {
                        window: Some(window),
                        index: data[0] as usize,
                        on_root,
                    });
                }
            }
            t if t == atoms.net_current_desktop => {
                self.pending.push_back(Event::WorkspaceRequest {
                    window: None,
                    index: data[0] as usize,
                    on_root,
                })
            }
            t if t == atoms.net_moveresize_window => {
                let flags = data[0];
                let current = self.get_window_geometry(window).unwrap_or_default();
                let value = |bit: u32, index: usize, fallback: i32| {
                    if flags & (1 << bit) != 0 {
                        data[index] as i32
                    } else {
                        fallback
                    }
                };

                let pos = (flags & (0b11 << 8) != 0).then(|| {
                    Pos::new(value(8, 1, current.pos.x), value(9, 2, current.pos.y))
                });
                let dim = (flags & (0b11 << 10) != 0).then(|| {
                    Dim::new(value(10, 3, current.dim.w), value(11, 4, current.dim.h))
                });

                self.pending.push_back(Event::PlacementRequest {
                    window,
                    pos,
                    dim,
                    on_root,
                });
            }
            t if t == atoms.net_wm_moveresize => match moveresize_grip(data[2]) {
                Some(grip) => self.pending.push_back(Event::GripRequest {
                    window,
                    pos: Pos::new(data[0] as i32, data[1] as i32),
                    grip,
                    on_root,
                }),
                None => debug!("X11: Ignoring moveresize direction {}", data[2]),
            },
            t if t == atoms.net_restack_window => {
                let mode = match data[2] {
                    0 => RestackMode::Above,
                    1 => RestackMode::Below,
                    _ => return,
                };

                self.pending.push_back(Event::RestackRequest {
                    window,
                    sibling: data[1],
                    mode,
                    on_root,
                });
            }
            t if t == atoms.net_request_frame_extents => {
                self.pending
                    .push_back(Event::FrameExtentsRequest { window, on_root })
            }
            t if t == atoms.wm_change_state => {
                if data[0] == IcccmWindowState::Iconic as u32 {
                    self.pending.push_back(Event::StateRequest {
                        window,
                        state: WindowState::Hidden,
                        action: ToggleAction::Add,
                        on_root,
                    });
                }
            }
            t => trace!("X11: Unhandled client message {} for {:#x}", t, window),
        }
    }

    // ------------------------------------------------------------------
    // Property helpers
    // ------------------------------------------------------------------

    fn property32(&self, window: Window, property: u32, type_: impl Into<u32>) -> Vec<u32> {
        Atoms::get_property32(&self.conn, window, property, type_, PROPERTY_LENGTH)
            .unwrap_or_default()
    }

    fn property_bytes(&self, window: Window, property: impl Into<u32>) -> Option<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, PROPERTY_LENGTH)
            .ok()?
            .reply()
            .ok()?;

        (reply.format == 8 && !reply.value.is_empty()).then_some(reply.value)
    }

    fn first_window(&self, window: Window, property: impl Into<u32>) -> Option<Window> {
        self.property32(window, property.into(), AtomEnum::WINDOW)
            .first()
            .copied()
            .filter(|&window| window != NONE)
    }

    fn window_states(&self, window: Window) -> Vec<WindowState> {
        self.property32(window, self.atoms.net_wm_state, AtomEnum::ATOM)
            .into_iter()
            .filter_map(|atom| self.atoms.window_state(atom))
            .collect()
    }

    fn wm_class(&self, window: Window) -> (String, String) {
        let Some(bytes) = self.property_bytes(window, AtomEnum::WM_CLASS) else {
            return Default::default();
        };

        let mut parts = bytes
            .split(|&b| b == 0)
            .map(|part| String::from_utf8_lossy(part).into_owned());

        let instance = parts.next().unwrap_or_default();
        let class = parts.next().unwrap_or_default();
        (instance, class)
    }

    fn button_grab(&self, window: Window, input: &MouseInput, mode: GrabMode) {
        for ignored in IGNORED_MODIFIERS {
            sent(self.conn.grab_button(
                false,
                window,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                mode,
                GrabMode::ASYNC,
                NONE,
                NONE,
                button_index(input.button),
                ModMask::from(input.modifiers.bits() | ignored),
            ));
        }
    }

    fn grab_keys(&self) {
        sent(self.conn.ungrab_key(xproto::Grab::ANY, self.root, ModMask::ANY));

        for input in &self.key_inputs {
            let keycodes = self.keymap.keycodes(&input.key);

            if keycodes.is_empty() {
                warn!("No keycode for key binding {}", input);
            }

            for &keycode in keycodes {
                for ignored in IGNORED_MODIFIERS {
                    sent(self.conn.grab_key(
                        true,
                        self.root,
                        ModMask::from(input.modifiers.bits() | ignored),
                        keycode,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    ));
                }
            }
        }
    }

    fn outputs_from_randr(&self) -> Result<Vec<Region>> {
        let resources = self
            .conn
            .randr_get_screen_resources_current(self.root)?
            .reply()
            .context("Failed to get screen resources")?;

        let mut outputs: Vec<Region> = Vec::new();

        for crtc in resources.crtcs {
            let info = self
                .conn
                .randr_get_crtc_info(crtc, resources.config_timestamp)?
                .reply()?;

            if info.mode == NONE || info.width == 0 || info.height == 0 {
                continue;
            }

            let region = Region::new(
                info.x.into(),
                info.y.into(),
                info.width.into(),
                info.height.into(),
            );

            // mirrored outputs share a crtc region
            if !outputs.contains(&region) {
                outputs.push(region);
            }
        }

        Ok(outputs)
    }
}

impl Connection for X11Connection {
    fn top_level_windows(&self) -> Vec<Window> {
        let Ok(tree) = self
            .conn
            .query_tree(self.root)
            .map_err(anyhow::Error::from)
            .and_then(|cookie| Ok(cookie.reply()?))
        else {
            return Vec::new();
        };

        tree.children
            .into_iter()
            .filter(|&window| window != self.check_window)
            .filter(|&window| {
                self.conn
                    .get_window_attributes(window)
                    .ok()
                    .and_then(|cookie| cookie.reply().ok())
                    .is_some_and(|attrs| {
                        !attrs.override_redirect && attrs.map_state == MapState::VIEWABLE
                    })
            })
            .collect()
    }

    fn connected_outputs(&self) -> Vec<Region> {
        if self.has_randr {
            match self.outputs_from_randr() {
                Ok(outputs) if !outputs.is_empty() => return outputs,
                Ok(_) => debug!("X11: RandR reported no active outputs"),
                Err(e) => warn!("Failed to query outputs: {:#}", e),
            }
        }

        vec![self.root_region]
    }

    fn create_frame(&mut self, region: Region) -> Window {
        let Ok(frame) = self.conn.generate_id() else {
            warn!("X11: Out of window ids");
            return NONE;
        };

        sent(self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            frame,
            self.root,
            coord(region.pos.x),
            coord(region.pos.y),
            extent(region.dim.w),
            extent(region.dim.h),
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().background_pixel(0).border_pixel(0),
        ));

        frame
    }

    fn create_handle(&mut self) -> Window {
        let Ok(handle) = self.conn.generate_id() else {
            warn!("X11: Out of window ids");
            return NONE;
        };

        sent(self.conn.create_window(
            0,
            handle,
            self.root,
            -2,
            -2,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().override_redirect(1),
        ));

        handle
    }

    fn init_window(&mut self, window: Window, focus_follows_mouse: bool) {
        let mut mask =
            EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY | EventMask::FOCUS_CHANGE;
        if focus_follows_mouse {
            mask |= EventMask::ENTER_WINDOW;
        }

        sent(self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().event_mask(mask),
        ));
        sent(self.conn.change_save_set(SetMode::INSERT, window));

        for input in &self.client_mouse_inputs {
            self.button_grab(window, input, GrabMode::ASYNC);
        }

        self.regrab_buttons(window);
    }

    fn init_frame(&mut self, frame: Window, focus_follows_mouse: bool) {
        let mut mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::EXPOSURE;
        if focus_follows_mouse {
            mask |= EventMask::ENTER_WINDOW;
        }

        sent(self.conn.change_window_attributes(
            frame,
            &ChangeWindowAttributesAux::new().event_mask(mask),
        ));
    }

    fn init_unmanaged(&mut self, window: Window) {
        sent(self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY),
        ));
    }

    fn cleanup_window(&mut self, window: Window) {
        sent(self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::NO_EVENT),
        ));
        sent(self.conn.ungrab_button(ButtonIndex::ANY, window, ModMask::ANY));
        sent(self.conn.change_save_set(SetMode::DELETE, window));
    }

    fn map_window(&mut self, window: Window) {
        sent(self.conn.map_window(window));
    }

    fn unmap_window(&mut self, window: Window) {
        sent(self.conn.unmap_window(window));
    }

    fn reparent_window(&mut self, window: Window, parent: Window, pos: Pos) {
        sent(self.conn.reparent_window(window, parent, coord(pos.x), coord(pos.y)));
    }

    fn unparent_window(&mut self, window: Window, pos: Pos) {
        sent(self.conn.reparent_window(window, self.root, coord(pos.x), coord(pos.y)));
    }

    fn destroy_window(&mut self, window: Window) {
        sent(self.conn.destroy_window(window));
    }

    fn close_window(&mut self, window: Window) -> bool {
        match self
            .atoms
            .supports_protocol(&self.conn, window, self.atoms.wm_delete_window)
        {
            Ok(true) => {
                debug!("X11: Sending WM_DELETE_WINDOW to {:#x}", window);
                self.atoms
                    .send_protocol(&self.conn, window, self.atoms.wm_delete_window)
                    .is_ok()
            }
            Ok(false) => self.kill_window(window),
            Err(e) => {
                debug!("X11: Window {:#x} is gone: {:#}", window, e);
                false
            }
        }
    }

    fn kill_window(&mut self, window: Window) -> bool {
        debug!("X11: Killing client of {:#x}", window);
        self.conn.kill_client(window).is_ok()
    }

    fn place_window(&mut self, window: Window, region: &Region) {
        sent(
            self.conn.configure_window(
                window,
                &ConfigureWindowAux::new()
                    .x(region.pos.x)
                    .y(region.pos.y)
                    .width(u32::from(extent(region.dim.w)))
                    .height(u32::from(extent(region.dim.h))),
            ),
        );
    }

    fn move_window(&mut self, window: Window, pos: Pos) {
        sent(self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().x(pos.x).y(pos.y),
        ));
    }

    fn stack_window_above(&mut self, window: Window, sibling: Option<Window>) {
        let aux = match sibling {
            Some(sibling) => ConfigureWindowAux::new()
                .sibling(sibling)
                .stack_mode(xproto::StackMode::ABOVE),
            None => ConfigureWindowAux::new().stack_mode(xproto::StackMode::BELOW),
        };

        sent(self.conn.configure_window(window, &aux));
    }

    fn focus_window(&mut self, window: Window) {
        sent(self.conn.set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME));

        if let Ok(true) = self
            .atoms
            .supports_protocol(&self.conn, window, self.atoms.wm_take_focus)
        {
            sent(
                self.atoms
                    .send_protocol(&self.conn, window, self.atoms.wm_take_focus),
            );
        }

        sent(self.atoms.update_active_window(&self.conn, self.root, Some(window)));
    }

    fn unfocus(&mut self) {
        sent(self.conn.set_input_focus(
            InputFocus::POINTER_ROOT,
            self.check_window,
            CURRENT_TIME,
        ));
        sent(self.atoms.update_active_window(&self.conn, self.root, None));
    }

    fn get_focused_window(&self) -> Option<Window> {
        let focus = self.conn.get_input_focus().ok()?.reply().ok()?.focus;

        (focus != NONE && focus != self.root && focus != self.check_window).then_some(focus)
    }

    fn set_window_border_width(&mut self, window: Window, width: u32) {
        sent(self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().border_width(width),
        ));
    }

    fn set_window_border_color(&mut self, window: Window, color: u32) {
        sent(self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().border_pixel(color),
        ));
    }

    fn set_window_background_color(&mut self, window: Window, color: u32) {
        sent(self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().background_pixel(color),
        ));
        sent(self.conn.clear_area(false, window, 0, 0, 0, 0));
    }

    fn get_window_geometry(&self, window: Window) -> Option<Region> {
        let geometry = self.conn.get_geometry(window).ok()?.reply().ok()?;

        Some(Region::new(
            geometry.x.into(),
            geometry.y.into(),
            geometry.width.into(),
            geometry.height.into(),
        ))
    }

    fn get_window_pid(&self, window: Window) -> Option<Pid> {
        self.property32(window, self.atoms.net_wm_pid, AtomEnum::CARDINAL)
            .first()
            .copied()
            .filter(|&pid| pid != 0)
    }

    fn get_parent_pid(&self, pid: Pid) -> Option<Pid> {
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        parent_pid(&stat)
    }

    fn get_icccm_window_name(&self, window: Window) -> String {
        self.property_bytes(window, self.atoms.net_wm_name)
            .or_else(|| self.property_bytes(window, AtomEnum::WM_NAME))
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }

    fn get_icccm_window_class(&self, window: Window) -> String {
        self.wm_class(window).1
    }

    fn get_icccm_window_instance(&self, window: Window) -> String {
        self.wm_class(window).0
    }

    fn get_icccm_window_transient_for(&self, window: Window) -> Option<Window> {
        self.first_window(window, AtomEnum::WM_TRANSIENT_FOR)
    }

    fn get_icccm_window_client_leader(&self, window: Window) -> Option<Window> {
        self.first_window(window, self.atoms.wm_client_leader)
    }

    fn get_icccm_window_hints(&self, window: Window) -> Option<Hints> {
        Hints::from_raw(&self.property32(window, AtomEnum::WM_HINTS.into(), AtomEnum::WM_HINTS))
    }

    fn get_icccm_window_size_hints(&self, window: Window) -> Option<SizeHints> {
        SizeHints::from_raw(
            &self.property32(
                window,
                AtomEnum::WM_NORMAL_HINTS.into(),
                AtomEnum::WM_SIZE_HINTS,
            ),
            Client::MIN_CLIENT_DIM,
        )
    }

    fn set_icccm_window_hints(&mut self, window: Window, hints: Hints) {
        let raw = self.property32(window, AtomEnum::WM_HINTS.into(), AtomEnum::WM_HINTS);
        let values = hints.to_raw((!raw.is_empty()).then_some(raw.as_slice()));

        sent(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            AtomEnum::WM_HINTS,
            AtomEnum::WM_HINTS,
            &values,
        ));
    }

    fn set_icccm_window_state(&mut self, window: Window, state: IcccmWindowState) {
        sent(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[state as u32, NONE],
        ));
    }

    fn get_window_preferred_type(&self, window: Window) -> WindowType {
        let declared = self
            .property32(window, self.atoms.net_wm_window_type, AtomEnum::ATOM)
            .into_iter()
            .find_map(|atom| self.atoms.window_type(atom));

        match declared {
            Some(window_type) => window_type,
            None if self.get_icccm_window_transient_for(window).is_some() => WindowType::Dialog,
            None => WindowType::Normal,
        }
    }

    fn get_window_preferred_state(&self, window: Window) -> Option<WindowState> {
        self.window_states(window).into_iter().next()
    }

    fn get_window_strut(&self, window: Window) -> Option<Extents> {
        let mut strut = self.property32(window, self.atoms.net_wm_strut_partial, AtomEnum::CARDINAL);
        if strut.len() < 4 {
            strut = self.property32(window, self.atoms.net_wm_strut, AtomEnum::CARDINAL);
        }

        match strut.as_slice() {
            [left, right, top, bottom, ..] => Some(Extents {
                left: *left as i32,
                right: *right as i32,
                top: *top as i32,
                bottom: *bottom as i32,
            }),
            _ => None,
        }
    }

    fn must_manage_window(&self, window: Window) -> bool {
        self.conn
            .get_window_attributes(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .is_some_and(|attrs| !attrs.override_redirect && attrs.class != WindowClass::INPUT_ONLY)
    }

    fn must_free_window(&self, window: Window) -> bool {
        let free_type = matches!(
            self.get_window_preferred_type(window),
            WindowType::Dialog | WindowType::Utility | WindowType::Toolbar | WindowType::Splash
        );

        free_type
            || self
                .get_icccm_window_size_hints(window)
                .is_some_and(|hints| hints.is_fixed())
    }

    fn window_is_fullscreen(&self, window: Window) -> bool {
        self.window_states(window).contains(&WindowState::Fullscreen)
    }

    fn window_is_sticky(&self, window: Window) -> bool {
        self.window_states(window).contains(&WindowState::Sticky)
            || self
                .property32(window, self.atoms.net_wm_desktop, AtomEnum::CARDINAL)
                .first()
                == Some(&ALL_DESKTOPS)
    }

    fn window_is_mappable(&self, window: Window) -> bool {
        let exists = self
            .conn
            .get_window_attributes(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .is_some_and(|attrs| attrs.class != WindowClass::INPUT_ONLY);

        let iconic = self
            .get_icccm_window_hints(window)
            .and_then(|hints| hints.initial_state)
            == Some(IcccmWindowState::Iconic as u32);

        exists && !iconic
    }

    fn get_window_desktop(&self, window: Window) -> Option<Index> {
        self.property32(window, self.atoms.net_wm_desktop, AtomEnum::CARDINAL)
            .first()
            .copied()
            .filter(|&desktop| desktop != ALL_DESKTOPS)
            .map(|desktop| desktop as Index)
    }

    fn set_window_desktop(&mut self, window: Window, index: Index) {
        sent(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms.net_wm_desktop,
            AtomEnum::CARDINAL,
            &[index as u32],
        ));
    }

    fn set_window_state(&mut self, window: Window, state: WindowState, on: bool) {
        sent(self.atoms.set_window_state(&self.conn, window, state, on));
    }

    fn set_window_frame_extents(&mut self, window: Window, extents: Extents) {
        let width = |value: i32| value.max(0) as u32;

        sent(self.atoms.update_frame_extents(
            &self.conn,
            window,
            width(extents.left),
            width(extents.right),
            width(extents.top),
            width(extents.bottom),
        ));
    }

    fn init_wm_properties(&mut self, wm_name: &str, desktop_names: &[String]) {
        sent(self.conn.change_property8(
            xproto::PropMode::REPLACE,
            self.check_window,
            self.atoms.net_wm_name,
            self.atoms.utf8_string,
            wm_name.as_bytes(),
        ));
        sent(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.root,
            self.atoms.net_number_of_desktops,
            AtomEnum::CARDINAL,
            &[desktop_names.len() as u32],
        ));
        sent(self.atoms.update_desktop_names(&self.conn, self.root, desktop_names));
        sent(self.atoms.update_active_window(&self.conn, self.root, None));
    }

    fn set_current_desktop(&mut self, index: Index) {
        sent(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            self.root,
            self.atoms.net_current_desktop,
            AtomEnum::CARDINAL,
            &[index as u32],
        ));
    }

    fn update_client_list(&mut self, clients: &[Window]) {
        sent(self.atoms.update_client_list(
            &self.conn,
            self.root,
            self.atoms.net_client_list,
            clients,
        ));
    }

    fn update_client_list_stacking(&mut self, clients: &[Window]) {
        sent(self.atoms.update_client_list(
            &self.conn,
            self.root,
            self.atoms.net_client_list_stacking,
            clients,
        ));
    }

    fn grab_bindings(&mut self, keys: &[KeyInput], mouse: &[MouseInput]) {
        self.key_inputs = keys.to_vec();
        self.grab_keys();

        let (root, client): (Vec<MouseInput>, Vec<MouseInput>) = mouse
            .iter()
            .partition(|input| input.target == MouseInputTarget::Root);

        sent(self.conn.ungrab_button(ButtonIndex::ANY, self.root, ModMask::ANY));
        for input in &root {
            self.button_grab(self.root, input, GrabMode::ASYNC);
        }

        self.client_mouse_inputs = client;
    }

    fn regrab_buttons(&mut self, window: Window) {
        // any click on an unfocused client focuses it
        sent(self.conn.grab_button(
            false,
            window,
            EventMask::BUTTON_PRESS,
            GrabMode::SYNC,
            GrabMode::ASYNC,
            NONE,
            NONE,
            ButtonIndex::ANY,
            ModMask::ANY,
        ));
    }

    fn ungrab_buttons(&mut self, window: Window) {
        sent(self.conn.ungrab_button(ButtonIndex::ANY, window, ModMask::ANY));

        for input in &self.client_mouse_inputs {
            self.button_grab(window, input, GrabMode::ASYNC);
        }
    }

    fn get_pointer_position(&self) -> Pos {
        self.conn
            .query_pointer(self.root)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map(|reply| Pos::new(reply.root_x.into(), reply.root_y.into()))
            .unwrap_or_default()
    }

    fn warp_pointer(&mut self, pos: Pos) {
        sent(self.conn.warp_pointer(
            NONE,
            self.root,
            0,
            0,
            0,
            0,
            coord(pos.x),
            coord(pos.y),
        ));
    }

    fn confine_pointer(&mut self, window: Window) {
        if self.confined.is_some() {
            return;
        }

        let region = self.root_region;
        self.place_window(window, &region);
        sent(self.conn.map_window(window));
        sent(self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(xproto::StackMode::ABOVE),
        ));

        let grabbed = self
            .conn
            .grab_pointer(
                false,
                window,
                EventMask::BUTTON_RELEASE | EventMask::BUTTON_MOTION | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                self.root,
                NONE,
                CURRENT_TIME,
            )
            .map_err(anyhow::Error::from)
            .and_then(|cookie| Ok(cookie.reply()?));

        match grabbed {
            Ok(reply) if reply.status == xproto::GrabStatus::SUCCESS => {
                self.confined = Some(window);
            }
            Ok(reply) => {
                debug!("X11: Pointer grab refused: {:?}", reply.status);
                sent(self.conn.unmap_window(window));
            }
            Err(e) => {
                warn!("X11: Pointer grab failed: {:#}", e);
                sent(self.conn.unmap_window(window));
            }
        }
    }

    fn release_pointer(&mut self) {
        let Some(window) = self.confined.take() else {
            return;
        };

        sent(self.conn.ungrab_pointer(CURRENT_TIME));
        sent(self.conn.unmap_window(window));
    }

    fn flush(&mut self) {
        sent(self.conn.flush());
    }

    fn cleanup(&mut self) {
        sent(self.conn.ungrab_key(xproto::Grab::ANY, self.root, ModMask::ANY));
        sent(self.conn.ungrab_button(ButtonIndex::ANY, self.root, ModMask::ANY));

        for property in self.atoms.root_properties() {
            sent(self.conn.delete_property(self.root, property));
        }

        sent(self.conn.destroy_window(self.check_window));
        sent(self.conn.set_input_focus(InputFocus::POINTER_ROOT, self.root, CURRENT_TIME));
        sent(self.conn.flush());
    }
}

fn button_from_detail(detail: u8) -> Option<Button> {
    match detail {
        1 => Some(Button::Left),
        2 => Some(Button::Middle),
        3 => Some(Button::Right),
        4 => Some(Button::ScrollUp),
        5 => Some(Button::ScrollDown),
        8 => Some(Button::Backward),
        9 => Some(Button::Forward),
        _ => None,
    }
}

fn button_index(button: Button) -> ButtonIndex {
    match button {
        Button::Left => ButtonIndex::M1,
        Button::Middle => ButtonIndex::M2,
        Button::Right => ButtonIndex::M3,
        Button::ScrollUp => ButtonIndex::M4,
        Button::ScrollDown => ButtonIndex::M5,
        Button::Backward => ButtonIndex::from(8u8),
        Button::Forward => ButtonIndex::from(9u8),
    }
}

fn state_action(action: u32) -> Option<ToggleAction> {
    match action {
        0 => Some(ToggleAction::Remove),
        1 => Some(ToggleAction::Add),
        2 => Some(ToggleAction::Toggle),
        _ => None,
    }
}

/// Map a _NET_WM_MOVERESIZE direction to a grip; `Some(None)` is a move
fn moveresize_grip(direction: u32) -> Option<Option<Grip>> {
    let grip = match direction {
        0 => Grip::Corner(Corner::TopLeft),
        1 => Grip::Edge(Edge::Top),
        2 => Grip::Corner(Corner::TopRight),
        3 => Grip::Edge(Edge::Right),
        4 | 9 => Grip::Corner(Corner::BottomRight),
        5 => Grip::Edge(Edge::Bottom),
        6 => Grip::Corner(Corner::BottomLeft),
        7 => Grip::Edge(Edge::Left),
        8 | 10 => return Some(None),
        _ => return None,
    };

    Some(Some(grip))
}

/// Parent pid from the contents of `/proc/<pid>/stat`
fn parent_pid(stat: &str) -> Option<Pid> {
    // the command name may itself contain spaces and parentheses
    let (_, rest) = stat.rsplit_once(')')?;
    let mut fields = rest.split_whitespace();
    let _state = fields.next()?;

    fields
        .next()?
        .parse()
        .ok()
        .filter(|&ppid: &Pid| ppid != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_pid() {
        assert_eq!(parent_pid("4242 (sh) S 4100 4242 4242 0 -1"), Some(4100));
        assert_eq!(parent_pid("77 (my (odd) cmd) R 12 77 77"), Some(12));
        assert_eq!(parent_pid("1 (init) S 0 1 1"), None);
        assert_eq!(parent_pid("garbage"), None);
    }

    #[test]
    fn test_moveresize_directions() {
        assert_eq!(moveresize_grip(0), Some(Some(Grip::Corner(Corner::TopLeft))));
        assert_eq!(moveresize_grip(7), Some(Some(Grip::Edge(Edge::Left))));
        assert_eq!(moveresize_grip(8), Some(None));
        assert_eq!(moveresize_grip(11), None);
    }

    #[test]
    fn test_button_mapping() {
        for detail in [1, 2, 3, 4, 5, 8, 9] {
            let button = button_from_detail(detail).unwrap();
            assert_eq!(u8::from(button_index(button)), detail);
        }

        assert_eq!(button_from_detail(6), None);
    }

    #[test]
    fn test_state_action() {
        assert_eq!(state_action(1), Some(ToggleAction::Add));
        assert_eq!(state_action(3), None);
    }
}
