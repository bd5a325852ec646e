//! Client Module
//!
//! A managed top-level window together with its decoration frame, the
//! regions it occupies in free and tiled mode, its place in the ownership
//! graph and its focus/sticky/disowned state machine.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::wm::client_flags::{ClientFlags, Toggle};
use crate::wm::decoration::{Decoration, Palette};
use crate::wm::geometry::{Dim, Extents, Index, Pid, Pos, Region, Window};
use crate::wm::hints::SizeHints;

static CLOCK: AtomicU64 = AtomicU64::new(1);

/// Monotonic logical timestamp; strictly increases with every reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(CLOCK.fetch_add(1, Ordering::Relaxed))
    }
}

/// Externally visible state of a client, selecting its colours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutsideState {
    Focused,
    FocusedDisowned,
    FocusedSticky,
    Unfocused,
    UnfocusedDisowned,
    UnfocusedSticky,
    Urgent,
}

/// Which of the client's regions a new placement updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementClass {
    Free(Region),
    Tile(Region),
}

#[derive(Debug, Clone)]
pub struct Client {
    window: Window,
    frame: Window,
    name: String,
    class: String,
    instance: String,
    pid: Option<Pid>,
    ppid: Option<Pid>,

    context: Index,
    workspace: Index,

    /// Outer regions (border included), root coordinates
    free_region: Region,
    tile_region: Region,
    active_region: Region,
    previous_region: Region,
    /// Inner window region, relative to the frame
    inner_region: Region,

    free_decoration: Decoration,
    active_decoration: Decoration,

    size_hints: Option<SizeHints>,
    warp_pos: Option<Pos>,

    parent: Option<Window>,
    children: Vec<Window>,
    producer: Option<Window>,
    consumers: Vec<Window>,

    flags: ClientFlags,
    outside_state: OutsideState,

    last_touched: Timestamp,
    last_focused: Timestamp,
    managed_since: Timestamp,

    expected_unmap_count: u8,
}

impl Client {
    /// Smallest outer dimension any client is shrunk to
    pub const MIN_CLIENT_DIM: Dim = Dim { w: 75, h: 50 };

    pub fn new(
        window: Window,
        frame: Window,
        name: String,
        class: String,
        instance: String,
        pid: Option<Pid>,
        ppid: Option<Pid>,
    ) -> Self {
        let now = Timestamp::now();

        Self {
            window,
            frame,
            name,
            class,
            instance,
            pid,
            ppid,
            context: 0,
            workspace: 0,
            free_region: Region::default(),
            tile_region: Region::default(),
            active_region: Region::default(),
            previous_region: Region::default(),
            inner_region: Region::default(),
            free_decoration: Decoration::FREE_DECORATION,
            active_decoration: Decoration::FREE_DECORATION,
            size_hints: None,
            warp_pos: None,
            parent: None,
            children: Vec::new(),
            producer: None,
            consumers: Vec::new(),
            flags: ClientFlags::initial(),
            outside_state: OutsideState::Unfocused,
            last_touched: now,
            last_focused: now,
            managed_since: now,
            expected_unmap_count: 0,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn frame(&self) -> Window {
        self.frame
    }

    /// (inner window, frame)
    pub fn windows(&self) -> (Window, Window) {
        (self.window, self.frame)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn set_class(&mut self, class: String) {
        self.class = class;
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn set_instance(&mut self, instance: String) {
        self.instance = instance;
    }

    /// `name:class:instance`, the key of the consume decision caches
    pub fn handle(&self) -> String {
        format!("{}:{}:{}", self.name, self.class, self.instance)
    }

    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    pub fn ppid(&self) -> Option<Pid> {
        self.ppid
    }

    pub fn context(&self) -> Index {
        self.context
    }

    pub fn set_context(&mut self, context: Index) {
        self.context = context;
    }

    pub fn workspace(&self) -> Index {
        self.workspace
    }

    pub fn set_workspace(&mut self, workspace: Index) {
        self.workspace = workspace;
    }

    // ------------------------------------------------------------------
    // Regions and decoration
    // ------------------------------------------------------------------

    pub fn free_region(&self) -> Region {
        self.free_region
    }

    pub fn tile_region(&self) -> Region {
        self.tile_region
    }

    pub fn active_region(&self) -> Region {
        self.active_region
    }

    pub fn previous_region(&self) -> Region {
        self.previous_region
    }

    pub fn inner_region(&self) -> Region {
        self.inner_region
    }

    /// Update the free or tile region and make it the active one
    pub fn set_region(&mut self, class: PlacementClass) {
        let region = match class {
            PlacementClass::Free(region) => {
                self.free_region = region;
                region
            }
            PlacementClass::Tile(region) => {
                self.tile_region = region;
                region
            }
        };

        self.previous_region = self.active_region;
        self.active_region = region;
        self.update_inner_region();
    }

    pub fn decoration(&self) -> Decoration {
        self.active_decoration
    }

    pub fn free_decoration(&self) -> Decoration {
        self.free_decoration
    }

    /// Set the active decoration, remembering it as the free one when
    /// placed freely
    pub fn set_decoration(&mut self, decoration: Decoration, free: bool) {
        if free {
            self.free_decoration = decoration;
        }

        self.active_decoration = decoration;
        self.update_inner_region();
    }

    /// Border plus frame padding of the active decoration
    pub fn frame_extents(&self) -> Extents {
        self.active_decoration.extents()
    }

    /// Geometry to configure the frame window with; the server draws the
    /// border outside of it
    pub fn frame_region(&self) -> Region {
        let border = self.active_decoration.border_width();

        Region {
            pos: self.active_region.pos,
            dim: Dim {
                w: (self.active_region.dim.w - 2 * border).max(1),
                h: (self.active_region.dim.h - 2 * border).max(1),
            },
        }
    }

    fn update_inner_region(&mut self) {
        let extents = self.active_decoration.extents();
        let frame = self.active_decoration.frame.unwrap_or_default();

        self.inner_region = Region {
            pos: Pos::new(frame.left, frame.top),
            dim: Dim {
                w: (self.active_region.dim.w - extents.left - extents.right).max(1),
                h: (self.active_region.dim.h - extents.top - extents.bottom).max(1),
            },
        };
    }

    /// (border width and colour, frame colour) for the current state
    pub fn decoration_colors(&self, palette: &Palette) -> (Option<(i32, u32)>, Option<u32>) {
        let state = self.outside_state();

        let border = self
            .active_decoration
            .border
            .map(|width| (width, palette.border.color(state)));

        let frame = self
            .active_decoration
            .frame
            .map(|_| palette.frame.color(state));

        (border, frame)
    }

    pub fn size_hints(&self) -> Option<SizeHints> {
        self.size_hints
    }

    pub fn set_size_hints(&mut self, size_hints: Option<SizeHints>) {
        self.size_hints = size_hints;
    }

    pub fn warp_pos(&self) -> Option<Pos> {
        self.warp_pos
    }

    pub fn set_warp_pos(&mut self, pos: Pos) {
        self.warp_pos = Some(pos);
    }

    // ------------------------------------------------------------------
    // Ownership graph
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Window> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Window) {
        self.parent = Some(parent);
    }

    pub fn unset_parent(&mut self) {
        self.parent = None;
    }

    pub fn children(&self) -> &[Window] {
        &self.children
    }

    pub fn add_child(&mut self, child: Window) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub fn remove_child(&mut self, child: Window) {
        self.children.retain(|&window| window != child);
    }

    pub fn producer(&self) -> Option<Window> {
        self.producer
    }

    pub fn set_producer(&mut self, producer: Window) {
        self.producer = Some(producer);
    }

    pub fn unset_producer(&mut self) {
        self.producer = None;
    }

    pub fn consumers(&self) -> &[Window] {
        &self.consumers
    }

    pub fn consumer_len(&self) -> usize {
        self.consumers.len()
    }

    pub fn add_consumer(&mut self, consumer: Window) {
        if !self.consumers.contains(&consumer) {
            self.consumers.push(consumer);
        }
    }

    pub fn remove_consumer(&mut self, consumer: Window) {
        self.consumers.retain(|&window| window != consumer);
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    pub fn flags(&self) -> ClientFlags {
        self.flags
    }

    fn toggle_flag(&mut self, flag: ClientFlags, toggle: Toggle) -> bool {
        let value = toggle.eval(self.flags.contains(flag));
        self.flags.set(flag, value);
        value
    }

    pub fn is_focused(&self) -> bool {
        self.flags.contains(ClientFlags::FOCUSED)
    }

    pub fn is_mapped(&self) -> bool {
        self.flags.contains(ClientFlags::MAPPED)
    }

    pub fn set_mapped(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::MAPPED, toggle);
    }

    pub fn is_managed(&self) -> bool {
        self.flags.contains(ClientFlags::MANAGED)
    }

    pub fn set_managed(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::MANAGED, toggle);
    }

    pub fn is_urgent(&self) -> bool {
        self.flags.contains(ClientFlags::URGENT)
    }

    pub fn set_urgent(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::URGENT, toggle);
    }

    pub fn is_floating(&self) -> bool {
        self.flags.contains(ClientFlags::FLOATING)
    }

    pub fn set_floating(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::FLOATING, toggle);
    }

    pub fn is_fullscreen(&self) -> bool {
        self.flags.contains(ClientFlags::FULLSCREEN)
    }

    pub fn set_fullscreen(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::FULLSCREEN, toggle);
    }

    pub fn is_contained(&self) -> bool {
        self.flags.contains(ClientFlags::CONTAINED)
    }

    pub fn set_contained(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::CONTAINED, toggle);
    }

    pub fn is_invincible(&self) -> bool {
        self.flags.contains(ClientFlags::INVINCIBLE)
    }

    pub fn set_invincible(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::INVINCIBLE, toggle);
    }

    pub fn is_sticky(&self) -> bool {
        self.flags.contains(ClientFlags::STICKY)
    }

    pub fn is_iconifyable(&self) -> bool {
        self.flags.contains(ClientFlags::ICONIFYABLE)
    }

    pub fn set_iconifyable(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::ICONIFYABLE, toggle);
    }

    pub fn is_iconified(&self) -> bool {
        self.flags.contains(ClientFlags::ICONIFIED)
    }

    pub fn set_iconified(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::ICONIFIED, toggle);
    }

    pub fn is_disowned(&self) -> bool {
        self.flags.contains(ClientFlags::DISOWNED)
    }

    pub fn is_producing(&self) -> bool {
        self.flags.contains(ClientFlags::PRODUCING)
    }

    pub fn set_producing(&mut self, toggle: Toggle) {
        self.toggle_flag(ClientFlags::PRODUCING, toggle);
    }

    /// Placed by its free region rather than by the layout
    pub fn is_free(&self) -> bool {
        self.is_floating() && (!self.is_fullscreen() || self.is_contained())
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    /// Derived outside state; urgency overrides the cached state
    pub fn outside_state(&self) -> OutsideState {
        if self.is_urgent() {
            OutsideState::Urgent
        } else {
            self.outside_state
        }
    }

    pub fn focus(&mut self) {
        self.flags.insert(ClientFlags::FOCUSED);
        self.last_focused = Timestamp::now();
        self.outside_state = match self.outside_state {
            OutsideState::Unfocused => OutsideState::Focused,
            OutsideState::UnfocusedDisowned => OutsideState::FocusedDisowned,
            OutsideState::UnfocusedSticky => OutsideState::FocusedSticky,
            state => state,
        };
    }

    pub fn unfocus(&mut self) {
        self.flags.remove(ClientFlags::FOCUSED);
        self.outside_state = match self.outside_state {
            OutsideState::Focused => OutsideState::Unfocused,
            OutsideState::FocusedDisowned => OutsideState::UnfocusedDisowned,
            OutsideState::FocusedSticky => OutsideState::UnfocusedSticky,
            state => state,
        };
    }

    pub fn stick(&mut self) {
        self.flags.insert(ClientFlags::STICKY);
        self.outside_state = match self.outside_state {
            OutsideState::Focused => OutsideState::FocusedSticky,
            OutsideState::Unfocused => OutsideState::UnfocusedSticky,
            state => state,
        };
    }

    pub fn unstick(&mut self) {
        self.flags.remove(ClientFlags::STICKY);
        self.outside_state = match self.outside_state {
            OutsideState::FocusedSticky => OutsideState::Focused,
            OutsideState::UnfocusedSticky => OutsideState::Unfocused,
            state => state,
        };
    }

    pub fn disown(&mut self) {
        self.flags.insert(ClientFlags::DISOWNED);
        self.outside_state = match self.outside_state {
            OutsideState::Focused => OutsideState::FocusedDisowned,
            OutsideState::Unfocused => OutsideState::UnfocusedDisowned,
            state => state,
        };
    }

    pub fn reclaim(&mut self) {
        self.flags.remove(ClientFlags::DISOWNED);
        self.outside_state = match self.outside_state {
            OutsideState::FocusedDisowned => OutsideState::Focused,
            OutsideState::UnfocusedDisowned => OutsideState::Unfocused,
            state => state,
        };
    }

    // ------------------------------------------------------------------
    // Timestamps and unmap bookkeeping
    // ------------------------------------------------------------------

    pub fn touch(&mut self) {
        self.last_touched = Timestamp::now();
    }

    pub fn last_touched(&self) -> Timestamp {
        self.last_touched
    }

    pub fn last_focused(&self) -> Timestamp {
        self.last_focused
    }

    pub fn managed_since(&self) -> Timestamp {
        self.managed_since
    }

    pub fn expect_unmap(&mut self) {
        self.expected_unmap_count = self.expected_unmap_count.saturating_add(1);
    }

    /// Consume one expected unmap; true if the unmap was self-inflicted
    pub fn consume_unmap_if_expecting(&mut self) -> bool {
        if self.expected_unmap_count > 0 {
            self.expected_unmap_count -= 1;
            true
        } else {
            false
        }
    }
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.window == other.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(
            1,
            2,
            "name".into(),
            "class".into(),
            "instance".into(),
            None,
            None,
        )
    }

    /// Reference model: focused, disowned, sticky tracked independently
    /// with the restriction that the cached state reflects at most one of
    /// disowned/sticky, whichever was applied first.
    fn reference(focused: bool, marker: Option<char>) -> OutsideState {
        match (focused, marker) {
            (true, None) => OutsideState::Focused,
            (true, Some('d')) => OutsideState::FocusedDisowned,
            (true, Some(_)) => OutsideState::FocusedSticky,
            (false, None) => OutsideState::Unfocused,
            (false, Some('d')) => OutsideState::UnfocusedDisowned,
            (false, Some(_)) => OutsideState::UnfocusedSticky,
        }
    }

    #[test]
    fn test_transition_table() {
        let mut c = client();
        assert_eq!(c.outside_state(), OutsideState::Unfocused);

        c.focus();
        assert_eq!(c.outside_state(), OutsideState::Focused);
        c.stick();
        assert_eq!(c.outside_state(), OutsideState::FocusedSticky);
        c.unfocus();
        assert_eq!(c.outside_state(), OutsideState::UnfocusedSticky);

        // disown does not apply on top of a sticky state
        c.disown();
        assert_eq!(c.outside_state(), OutsideState::UnfocusedSticky);
        c.unstick();
        assert_eq!(c.outside_state(), OutsideState::Unfocused);

        c.disown();
        assert_eq!(c.outside_state(), OutsideState::UnfocusedDisowned);
        c.stick();
        assert_eq!(c.outside_state(), OutsideState::UnfocusedDisowned);
        c.focus();
        assert_eq!(c.outside_state(), OutsideState::FocusedDisowned);
        c.reclaim();
        assert_eq!(c.outside_state(), OutsideState::Focused);
    }

    #[test]
    fn test_all_six_step_sequences() {
        let ops = ['f', 'u', 's', 'S', 'd', 'r'];

        for code in 0..6usize.pow(6) {
            let mut c = client();
            let mut focused = false;
            let mut marker: Option<char> = None;
            let mut code = code;

            for _ in 0..6 {
                let op = ops[code % 6];
                code /= 6;

                match op {
                    'f' => {
                        c.focus();
                        focused = true;
                    }
                    'u' => {
                        c.unfocus();
                        focused = false;
                    }
                    's' => {
                        c.stick();
                        marker = marker.or(Some('s'));
                    }
                    'S' => {
                        c.unstick();
                        if marker == Some('s') {
                            marker = None;
                        }
                    }
                    'd' => {
                        c.disown();
                        marker = marker.or(Some('d'));
                    }
                    _ => {
                        c.reclaim();
                        if marker == Some('d') {
                            marker = None;
                        }
                    }
                }

                assert_eq!(c.outside_state(), reference(focused, marker));
                assert_eq!(c.is_focused(), focused);
            }
        }
    }

    #[test]
    fn test_urgent_overrides() {
        let mut c = client();
        c.focus();
        c.stick();
        c.set_urgent(Toggle::On);
        assert_eq!(c.outside_state(), OutsideState::Urgent);

        c.set_urgent(Toggle::Off);
        assert_eq!(c.outside_state(), OutsideState::FocusedSticky);
    }

    #[test]
    fn test_expected_unmap_counting() {
        let mut c = client();
        assert!(!c.consume_unmap_if_expecting());

        c.expect_unmap();
        c.expect_unmap();
        assert!(c.consume_unmap_if_expecting());
        assert!(c.consume_unmap_if_expecting());
        assert!(!c.consume_unmap_if_expecting());
    }

    #[test]
    fn test_inner_region_follows_decoration() {
        let mut c = client();
        c.set_decoration(Decoration::FREE_DECORATION, true);
        c.set_region(PlacementClass::Free(Region::new(100, 100, 200, 150)));

        assert_eq!(c.inner_region(), Region::new(0, 3, 198, 145));
        assert_eq!(c.frame_region(), Region::new(100, 100, 198, 148));

        c.set_decoration(Decoration::NO_DECORATION, false);
        c.set_region(PlacementClass::Tile(Region::new(0, 0, 500, 400)));
        assert_eq!(c.inner_region(), Region::new(0, 0, 500, 400));
        assert_eq!(c.previous_region(), Region::new(100, 100, 200, 150));
        assert_eq!(c.free_region(), Region::new(100, 100, 200, 150));
    }

    #[test]
    fn test_timestamps_increase() {
        let mut c = client();
        let before = c.last_focused();
        c.focus();
        assert!(c.last_focused() > before);
    }
}
