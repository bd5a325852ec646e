//! Layout Module
//!
//! The sixteen layout kinds, their static configuration, the tunable data
//! each kind keeps (margin, gap, main area), and the arrangement algorithm
//! that turns a sequence of clients into placements.
//!
//! Tuning data can be saved to and loaded from numbered slots on disk.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::wm::client::Client;
use crate::wm::cycle::Cycle;
use crate::wm::decoration::Decoration;
use crate::wm::geometry::{Dim, Direction, Edge, Extents, Pos, Region, Window};
use crate::wm::placement::{Placement, PlacementMethod};

pub const MIN_GAP_SIZE: u32 = 0;
pub const MAX_GAP_SIZE: u32 = 300;
pub const MIN_MAIN_COUNT: u32 = 0;
pub const MAX_MAIN_COUNT: u32 = 16;
pub const MIN_MAIN_FACTOR: f32 = 0.05;
pub const MAX_MAIN_FACTOR: f32 = 0.95;

pub const MAX_MARGIN: Extents = Extents {
    left: 700,
    right: 700,
    top: 400,
    bottom: 400,
};

/// Number of tuning data variants every layout kind starts with
pub const DEFAULT_DATA_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    // free-form
    Float,
    FramelessFloat,
    SingleFloat,
    FramelessSingleFloat,

    // overlapping tiled
    Center,
    Monocle,

    // non-overlapping tiled
    Paper,
    SPaper,
    Stack,
    SStack,
    BStack,
    SBStack,
    Horz,
    SHorz,
    Vert,
    SVert,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 16] = [
        LayoutKind::Float,
        LayoutKind::FramelessFloat,
        LayoutKind::SingleFloat,
        LayoutKind::FramelessSingleFloat,
        LayoutKind::Center,
        LayoutKind::Monocle,
        LayoutKind::Paper,
        LayoutKind::SPaper,
        LayoutKind::Stack,
        LayoutKind::SStack,
        LayoutKind::BStack,
        LayoutKind::SBStack,
        LayoutKind::Horz,
        LayoutKind::SHorz,
        LayoutKind::Vert,
        LayoutKind::SVert,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::Float => "float",
            LayoutKind::FramelessFloat => "frameless_float",
            LayoutKind::SingleFloat => "single_float",
            LayoutKind::FramelessSingleFloat => "frameless_single_float",
            LayoutKind::Center => "center",
            LayoutKind::Monocle => "monocle",
            LayoutKind::Paper => "paper",
            LayoutKind::SPaper => "spaper",
            LayoutKind::Stack => "stack",
            LayoutKind::SStack => "sstack",
            LayoutKind::BStack => "bstack",
            LayoutKind::SBStack => "sbstack",
            LayoutKind::Horz => "horz",
            LayoutKind::SHorz => "shorz",
            LayoutKind::Vert => "vert",
            LayoutKind::SVert => "svert",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Tag written into persisted layout records
    pub fn tag(self) -> u32 {
        Self::ALL
            .iter()
            .position(|&kind| kind == self)
            .unwrap_or_default() as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn config(self) -> LayoutConfig {
        let free = |decoration, single| LayoutConfig {
            method: PlacementMethod::Free,
            decoration,
            margin: false,
            gap: false,
            persistent: single,
            single,
            wraps: true,
        };

        let tile = |decoration, persistent, wraps| LayoutConfig {
            method: PlacementMethod::Tile,
            decoration,
            margin: true,
            gap: true,
            persistent,
            single: false,
            wraps,
        };

        match self {
            LayoutKind::Float => free(Decoration::FREE_DECORATION, false),
            LayoutKind::FramelessFloat => free(Decoration::BORDER_DECORATION, false),
            LayoutKind::SingleFloat => free(Decoration::FREE_DECORATION, true),
            LayoutKind::FramelessSingleFloat => free(Decoration::BORDER_DECORATION, true),
            LayoutKind::Center => tile(Decoration::BORDER_DECORATION, false, true),
            LayoutKind::Monocle => tile(Decoration::NO_DECORATION, false, true),
            LayoutKind::Paper => tile(Decoration::BORDER_DECORATION, false, false),
            LayoutKind::SPaper => tile(Decoration::BORDER_DECORATION, true, false),
            LayoutKind::Stack | LayoutKind::BStack | LayoutKind::Horz | LayoutKind::Vert => {
                tile(Decoration::BORDER_DECORATION, false, true)
            }
            LayoutKind::SStack | LayoutKind::SBStack | LayoutKind::SHorz | LayoutKind::SVert => {
                tile(Decoration::BORDER_DECORATION, true, true)
            }
        }
    }
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable per-kind configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub method: PlacementMethod,
    pub decoration: Decoration,
    /// Shrink the working region by the data's margin
    pub margin: bool,
    /// Shrink every tiled placement by the data's gap size
    pub gap: bool,
    /// Re-arrange whenever focus changes
    pub persistent: bool,
    /// Show only the focused client
    pub single: bool,
    /// Focus cycling wraps around the ends of the client order
    pub wraps: bool,
}

/// Tunable parameters of one layout variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutData {
    pub margin: Extents,
    pub gap_size: u32,
    pub main_count: u32,
    pub main_factor: f32,
}

impl Default for LayoutData {
    fn default() -> Self {
        Self {
            margin: Extents::default(),
            gap_size: 0,
            main_count: 1,
            main_factor: 0.50,
        }
    }
}

impl LayoutData {
    /// Size of one persisted entry
    const RECORD_LEN: usize = 4 * 4 + 8 + 8 + 4;

    fn encode(&self, buf: &mut Vec<u8>) {
        for edge in [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom] {
            buf.extend_from_slice(&self.margin.get(edge).to_le_bytes());
        }

        buf.extend_from_slice(&(self.gap_size as u64).to_le_bytes());
        buf.extend_from_slice(&(self.main_count as u64).to_le_bytes());
        buf.extend_from_slice(&self.main_factor.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let i32_at = |at: usize| i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let u64_at = |at: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(word)
        };

        Self {
            margin: Extents {
                left: i32_at(0).clamp(0, MAX_MARGIN.left),
                right: i32_at(4).clamp(0, MAX_MARGIN.right),
                top: i32_at(8).clamp(0, MAX_MARGIN.top),
                bottom: i32_at(12).clamp(0, MAX_MARGIN.bottom),
            },
            gap_size: u64_at(16).min(MAX_GAP_SIZE as u64) as u32,
            main_count: u64_at(24).min(MAX_MAIN_COUNT as u64) as u32,
            main_factor: {
                let factor = f32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]);

                if factor.is_finite() {
                    factor.clamp(MIN_MAIN_FACTOR, MAX_MAIN_FACTOR)
                } else {
                    LayoutData::default().main_factor
                }
            },
        }
    }
}

/// One layout kind with its cycle of tuning data variants
#[derive(Debug, Clone)]
pub struct Layout {
    pub kind: LayoutKind,
    pub config: LayoutConfig,
    pub data: Cycle<LayoutData>,
}

impl Layout {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            kind,
            config: kind.config(),
            data: Cycle::new(vec![LayoutData::default(); DEFAULT_DATA_COUNT]),
        }
    }

    pub fn active_data(&self) -> LayoutData {
        self.data.active_element().copied().unwrap_or_default()
    }

    fn active_data_mut(&mut self) -> Option<&mut LayoutData> {
        self.data.active_element_mut()
    }
}

/// A client as seen by the arrangement algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrangeable {
    pub window: Window,
    pub free_region: Region,
}

/// Per-workspace layout state: every kind with its data, and the active
/// and previously active kind
#[derive(Debug, Clone)]
pub struct LayoutHandler {
    kind: LayoutKind,
    prev_kind: LayoutKind,
    layouts: HashMap<LayoutKind, Layout>,
}

impl Default for LayoutHandler {
    fn default() -> Self {
        Self::new(LayoutKind::Stack)
    }
}

impl LayoutHandler {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            kind,
            prev_kind: kind,
            layouts: LayoutKind::ALL
                .into_iter()
                .map(|kind| (kind, Layout::new(kind)))
                .collect(),
        }
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn layout(&self) -> &Layout {
        &self.layouts[&self.kind]
    }

    fn layout_mut(&mut self) -> &mut Layout {
        self.layouts
            .entry(self.kind)
            .or_insert_with_key(|&kind| Layout::new(kind))
    }

    pub fn config(&self) -> LayoutConfig {
        self.layout().config
    }

    pub fn data(&self) -> LayoutData {
        self.layout().active_data()
    }

    /// Activate `kind`; returns false if it was already active
    pub fn set_kind(&mut self, kind: LayoutKind) -> bool {
        if kind == self.kind {
            return false;
        }

        self.prev_kind = self.kind;
        self.kind = kind;
        true
    }

    /// Swap back to the previously active kind
    pub fn toggle_kind(&mut self) -> LayoutKind {
        std::mem::swap(&mut self.kind, &mut self.prev_kind);
        self.kind
    }

    // ------------------------------------------------------------------
    // Arrangement
    // ------------------------------------------------------------------

    /// Compute placements for `clients` inside `region`
    ///
    /// `focus` is the workspace's active client, which single-window kinds
    /// reveal and Paper widens.
    pub fn arrange(
        &self,
        region: Region,
        clients: &[Arrangeable],
        focus: Option<Window>,
    ) -> Vec<Placement> {
        let layout = self.layout();
        let config = layout.config;
        let data = layout.active_data();

        if clients.is_empty() {
            return Vec::new();
        }

        if config.method == PlacementMethod::Tile && clients.len() == 1 {
            return vec![Placement::new(
                PlacementMethod::Tile,
                clients[0].window,
                Decoration::NO_DECORATION,
                Some(region),
            )];
        }

        let region = if config.margin {
            region.without_extents(data.margin)
        } else {
            region
        };

        let focus_index = focus
            .and_then(|focus| clients.iter().position(|client| client.window == focus))
            .unwrap_or(0);

        let regions: Vec<Option<Region>> = match self.kind {
            LayoutKind::Float | LayoutKind::FramelessFloat => clients
                .iter()
                .map(|client| Some(client.free_region))
                .collect(),
            LayoutKind::SingleFloat | LayoutKind::FramelessSingleFloat => clients
                .iter()
                .enumerate()
                .map(|(i, client)| Some(client.free_region).filter(|_| i == focus_index))
                .collect(),
            LayoutKind::Center => arrange_center(region, clients.len(), &data),
            LayoutKind::Monocle => vec![Some(region); clients.len()],
            LayoutKind::Paper | LayoutKind::SPaper => {
                arrange_paper(region, clients.len(), focus_index, &data)
            }
            LayoutKind::Stack | LayoutKind::SStack => {
                arrange_stack(region, clients.len(), &data, false)
            }
            LayoutKind::BStack | LayoutKind::SBStack => {
                arrange_stack(region, clients.len(), &data, true)
            }
            LayoutKind::Horz | LayoutKind::SHorz => arrange_split(region, clients.len(), false),
            LayoutKind::Vert | LayoutKind::SVert => arrange_split(region, clients.len(), true),
        };

        clients
            .iter()
            .zip(regions)
            .map(|(client, region)| {
                let region = match (config.method, region) {
                    (PlacementMethod::Tile, Some(region)) if config.gap => {
                        Some(apply_gap(region, data.gap_size as i32))
                    }
                    (_, region) => region,
                };

                Placement::new(config.method, client.window, config.decoration, region)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Tuning
    // ------------------------------------------------------------------

    /// Change the active gap size by `delta`, saturating at the bounds
    pub fn change_gap_size(&mut self, delta: i32) -> bool {
        self.modify_data(|data| {
            data.gap_size = (data.gap_size as i64 + delta as i64)
                .clamp(MIN_GAP_SIZE as i64, MAX_GAP_SIZE as i64) as u32;
        })
    }

    pub fn change_main_count(&mut self, delta: i32) -> bool {
        self.modify_data(|data| {
            data.main_count = (data.main_count as i64 + delta as i64)
                .clamp(MIN_MAIN_COUNT as i64, MAX_MAIN_COUNT as i64) as u32;
        })
    }

    pub fn change_main_factor(&mut self, delta: f32) -> bool {
        if !delta.is_finite() {
            return false;
        }

        self.modify_data(|data| {
            data.main_factor = (data.main_factor + delta).clamp(MIN_MAIN_FACTOR, MAX_MAIN_FACTOR);
        })
    }

    /// Change one edge of the margin, or all of them with `None`
    pub fn change_margin(&mut self, edge: Option<Edge>, delta: i32) -> bool {
        let edges = match edge {
            Some(edge) => vec![edge],
            None => Edge::ALL.to_vec(),
        };

        self.modify_data(|data| {
            for edge in edges {
                let value = data.margin.get_mut(edge);
                *value = value.saturating_add(delta).clamp(0, MAX_MARGIN.get(edge));
            }
        })
    }

    pub fn reset_gap_size(&mut self) -> bool {
        self.modify_data(|data| data.gap_size = LayoutData::default().gap_size)
    }

    pub fn reset_margin(&mut self) -> bool {
        self.modify_data(|data| data.margin = LayoutData::default().margin)
    }

    pub fn reset_layout_data(&mut self) -> bool {
        self.modify_data(|data| *data = LayoutData::default())
    }

    /// Copy the previous kind's active data into the active kind
    pub fn copy_prev_layout_data(&mut self) -> bool {
        let prev = self.layouts[&self.prev_kind].active_data();
        self.modify_data(|data| *data = prev)
    }

    pub fn cycle_layout_data(&mut self, dir: Direction) -> bool {
        self.layout_mut().data.cycle_active(dir, true).is_some()
    }

    fn modify_data(&mut self, modify: impl FnOnce(&mut LayoutData)) -> bool {
        let Some(data) = self.layout_mut().active_data_mut() else {
            return false;
        };

        let before = *data;
        modify(data);
        *data != before
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the active kind's data cycle into slot `slot` under `dir`
    pub fn save_layout(&self, dir: &Path, slot: usize) -> Result<PathBuf> {
        let layout = self.layout();
        let path = dir.join(slot.to_string());

        let mut buf = Vec::with_capacity(12 + layout.data.len() * LayoutData::RECORD_LEN);
        buf.extend_from_slice(&self.kind.tag().to_le_bytes());
        buf.extend_from_slice(&(layout.data.len() as u64).to_le_bytes());

        for data in layout.data.iter() {
            data.encode(&mut buf);
        }

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create layout directory {}", dir.display()))?;

        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(&buf)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Saved {} layout data to {}", self.kind, path.display());
        Ok(path)
    }

    /// Restore a data cycle from slot `slot` and activate its kind
    pub fn load_layout(&mut self, dir: &Path, slot: usize) -> Result<LayoutKind> {
        let path = dir.join(slot.to_string());
        let bytes =
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;

        if bytes.len() < 12 {
            bail!("Layout record {} is truncated", path.display());
        }

        let tag = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let Some(kind) = LayoutKind::from_tag(tag) else {
            bail!("Layout record {} has unknown kind {}", path.display(), tag);
        };

        let mut count = [0u8; 8];
        count.copy_from_slice(&bytes[4..12]);
        let count = u64::from_le_bytes(count) as usize;

        let mut data: Vec<LayoutData> = bytes[12..]
            .chunks_exact(LayoutData::RECORD_LEN)
            .take(count.min(DEFAULT_DATA_COUNT))
            .map(LayoutData::decode)
            .collect();

        if data.len() < count.min(DEFAULT_DATA_COUNT) {
            debug!("Layout record {} holds fewer entries than announced", path.display());
        }

        data.resize(DEFAULT_DATA_COUNT, LayoutData::default());

        self.set_kind(kind);
        self.layout_mut().data = Cycle::new(data);

        info!("Loaded {} layout data from {}", kind, path.display());
        Ok(kind)
    }
}

/// Default directory holding the numbered layout slots
pub fn default_layout_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("krane")
        .join("layouts")
}

fn apply_gap(region: Region, gap: i32) -> Region {
    Region {
        pos: Pos {
            x: region.pos.x + gap,
            y: region.pos.y + gap,
        },
        dim: Dim {
            w: region.dim.w - 2 * gap,
            h: region.dim.h - 2 * gap,
        },
    }
    .with_minimum_dim(Client::MIN_CLIENT_DIM)
}

fn arrange_center(region: Region, n: usize, data: &LayoutData) -> Vec<Option<Region>> {
    // width follows the main factor, height shrinks as the main count grows
    let rows = (MAX_MAIN_COUNT + 1) as i32;
    let dim = Dim {
        w: (region.dim.w as f32 * data.main_factor / MAX_MAIN_FACTOR) as i32,
        h: region.dim.h * (rows - data.main_count as i32) / rows,
    };

    vec![Some(region.center_of(dim)); n]
}

fn arrange_paper(
    region: Region,
    n: usize,
    focus_index: usize,
    data: &LayoutData,
) -> Vec<Option<Region>> {
    let focus_width = (region.dim.w as f32 * data.main_factor.max(0.5)) as i32;
    let other_width = (region.dim.w - focus_width) / (n as i32 - 1).max(1);

    let mut x = region.pos.x;

    (0..n)
        .map(|i| {
            let w = if i == focus_index {
                focus_width
            } else {
                other_width
            };

            let placed = Region {
                pos: Pos { x, y: region.pos.y },
                dim: Dim { w, h: region.dim.h },
            };

            x += w;
            Some(placed)
        })
        .collect()
}

/// Main area along one axis at `main_factor`, the stack along the other;
/// `transposed` puts the main area on top instead of on the left
fn arrange_stack(
    region: Region,
    n: usize,
    data: &LayoutData,
    transposed: bool,
) -> Vec<Option<Region>> {
    let main_count = (data.main_count as usize).min(n);
    let stack_count = n - main_count;

    let (length, breadth) = if transposed {
        (region.dim.h, region.dim.w)
    } else {
        (region.dim.w, region.dim.h)
    };

    let main_length = match (main_count, stack_count) {
        (0, _) => 0,
        (_, 0) => length,
        _ => (length as f32 * data.main_factor) as i32,
    };

    let stack_length = length - main_length;

    let place = |along: i32, across: i32, l: i32, b: i32| {
        let (x, y, w, h) = if transposed {
            (across, along, b, l)
        } else {
            (along, across, l, b)
        };

        Some(Region::new(region.pos.x + x, region.pos.y + y, w, h))
    };

    let main_breadth = breadth / main_count.max(1) as i32;
    let stack_breadth = breadth / stack_count.max(1) as i32;

    (0..n)
        .map(|i| {
            if i < main_count {
                place(0, i as i32 * main_breadth, main_length, main_breadth)
            } else {
                let j = (i - main_count) as i32;
                place(main_length, j * stack_breadth, stack_length, stack_breadth)
            }
        })
        .collect()
}

/// Evenly split `region` into columns, or rows when `vertical`
fn arrange_split(region: Region, n: usize, vertical: bool) -> Vec<Option<Region>> {
    let length = if vertical { region.dim.h } else { region.dim.w };
    let step = (length as f32 / n as f32).round() as i32;

    (0..n as i32)
        .map(|i| {
            Some(if vertical {
                Region::new(region.pos.x, region.pos.y + i * step, region.dim.w, step)
            } else {
                Region::new(region.pos.x + i * step, region.pos.y, step, region.dim.h)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clients(n: usize) -> Vec<Arrangeable> {
        (0..n)
            .map(|i| Arrangeable {
                window: i as Window + 1,
                free_region: Region::new(10 * i as i32, 10, 200, 100),
            })
            .collect()
    }

    fn regions(placements: &[Placement]) -> Vec<Option<Region>> {
        placements.iter().map(|placement| placement.region).collect()
    }

    #[test]
    fn test_single_client_gets_full_region() {
        let region = Region::new(0, 20, 1920, 1060);

        for kind in LayoutKind::ALL {
            let mut handler = LayoutHandler::new(kind);
            handler.change_gap_size(20);
            handler.change_margin(None, 50);
            handler.change_main_count(3);

            let placements = handler.arrange(region, &clients(1), Some(1));

            if kind.config().method == PlacementMethod::Tile {
                assert_eq!(placements.len(), 1, "{kind}");
                assert_eq!(placements[0].region, Some(region), "{kind}");
                assert_eq!(placements[0].decoration, Decoration::NO_DECORATION, "{kind}");
            }
        }
    }

    #[test]
    fn test_stack_five_clients() {
        let mut handler = LayoutHandler::new(LayoutKind::Stack);
        handler.change_main_count(1);
        assert_eq!(handler.data().main_count, 2);

        let placements = handler.arrange(Region::new(0, 0, 1000, 1000), &clients(5), None);

        assert_eq!(
            regions(&placements),
            vec![
                Some(Region::new(0, 0, 500, 500)),
                Some(Region::new(0, 500, 500, 500)),
                Some(Region::new(500, 0, 500, 333)),
                Some(Region::new(500, 333, 500, 333)),
                Some(Region::new(500, 666, 500, 333)),
            ]
        );
        assert!(placements
            .iter()
            .all(|placement| placement.decoration == Decoration::BORDER_DECORATION));
    }

    #[test]
    fn test_stack_without_main_area() {
        let mut handler = LayoutHandler::new(LayoutKind::Stack);
        handler.change_main_count(-1);

        let placements = handler.arrange(Region::new(0, 0, 900, 900), &clients(3), None);
        assert_eq!(placements[1].region, Some(Region::new(0, 300, 900, 300)));
    }

    #[test]
    fn test_stack_all_main() {
        let mut handler = LayoutHandler::new(LayoutKind::SStack);
        handler.change_main_count(4);

        let placements = handler.arrange(Region::new(0, 0, 800, 600), &clients(2), None);
        assert_eq!(placements[0].region, Some(Region::new(0, 0, 800, 300)));
        assert_eq!(placements[1].region, Some(Region::new(0, 300, 800, 300)));
    }

    #[test]
    fn test_bstack_transposes_stack() {
        let handler = LayoutHandler::new(LayoutKind::BStack);
        let placements = handler.arrange(Region::new(0, 0, 1000, 800), &clients(3), None);

        assert_eq!(
            regions(&placements),
            vec![
                Some(Region::new(0, 0, 1000, 400)),
                Some(Region::new(0, 400, 500, 400)),
                Some(Region::new(500, 400, 500, 400)),
            ]
        );
    }

    #[test]
    fn test_horz_three_clients() {
        let handler = LayoutHandler::new(LayoutKind::Horz);
        let placements = handler.arrange(Region::new(0, 0, 900, 600), &clients(3), None);

        assert_eq!(
            regions(&placements),
            vec![
                Some(Region::new(0, 0, 300, 600)),
                Some(Region::new(300, 0, 300, 600)),
                Some(Region::new(600, 0, 300, 600)),
            ]
        );
    }

    #[test]
    fn test_split_rounds_to_nearest() {
        let handler = LayoutHandler::new(LayoutKind::Vert);
        let placements = handler.arrange(Region::new(0, 0, 100, 1000), &clients(3), None);

        // 1000 / 3 = 333.33 rounds down, 1000 / 6 = 166.67 rounds up
        assert_eq!(placements[1].region, Some(Region::new(0, 333, 100, 333)));

        let placements = handler.arrange(Region::new(0, 0, 100, 1000), &clients(6), None);
        assert_eq!(placements[1].region, Some(Region::new(0, 167, 100, 167)));
    }

    #[test]
    fn test_paper_widens_focus() {
        let handler = LayoutHandler::new(LayoutKind::Paper);
        let placements = handler.arrange(Region::new(0, 0, 1000, 500), &clients(3), Some(2));

        assert_eq!(
            regions(&placements),
            vec![
                Some(Region::new(0, 0, 250, 500)),
                Some(Region::new(250, 0, 500, 500)),
                Some(Region::new(750, 0, 250, 500)),
            ]
        );
    }

    #[test]
    fn test_center_ratios() {
        let handler = LayoutHandler::new(LayoutKind::Center);
        let placements = handler.arrange(Region::new(0, 0, 950, 1700), &clients(2), None);

        // factor 0.5 / 0.95 of the width, (17 - 1) / 17 of the height
        let expected = Region::new(225, 50, 500, 1600);
        assert_eq!(regions(&placements), vec![Some(expected); 2]);
    }

    #[test]
    fn test_single_float_reveals_focus_only() {
        let handler = LayoutHandler::new(LayoutKind::SingleFloat);
        let input = clients(3);
        let placements = handler.arrange(Region::new(0, 0, 1000, 1000), &input, Some(2));

        assert_eq!(
            regions(&placements),
            vec![None, Some(input[1].free_region), None]
        );
        assert!(placements
            .iter()
            .all(|placement| placement.method == PlacementMethod::Free));
    }

    #[test]
    fn test_float_keeps_free_regions() {
        let handler = LayoutHandler::new(LayoutKind::Float);
        let input = clients(2);
        let placements = handler.arrange(Region::new(0, 0, 1000, 1000), &input, None);
        assert_eq!(placements[0].region, Some(input[0].free_region));
        assert_eq!(placements[0].decoration, Decoration::FREE_DECORATION);
    }

    #[test]
    fn test_gap_and_margin() {
        let mut handler = LayoutHandler::new(LayoutKind::Monocle);
        handler.change_gap_size(10);
        handler.change_margin(Some(Edge::Top), 20);

        let placements = handler.arrange(Region::new(0, 0, 1000, 800), &clients(2), None);
        assert_eq!(placements[0].region, Some(Region::new(10, 30, 980, 760)));

        handler.change_gap_size(290);
        let placements = handler.arrange(Region::new(0, 0, 500, 500), &clients(2), None);
        assert_eq!(placements[0].region.map(|region| region.dim), Some(Client::MIN_CLIENT_DIM));
    }

    #[test]
    fn test_tuning_saturates() {
        let mut handler = LayoutHandler::default();

        for _ in 0..1000 {
            handler.change_gap_size(1);
        }
        assert_eq!(handler.data().gap_size, MAX_GAP_SIZE);
        assert!(!handler.change_gap_size(1));

        handler.change_main_factor(-1.0);
        assert_eq!(handler.data().main_factor, MIN_MAIN_FACTOR);
        handler.change_main_factor(5.0);
        assert_eq!(handler.data().main_factor, MAX_MAIN_FACTOR);

        handler.change_main_count(100);
        assert_eq!(handler.data().main_count, MAX_MAIN_COUNT);
        handler.change_main_count(-100);
        assert_eq!(handler.data().main_count, MIN_MAIN_COUNT);

        handler.change_margin(None, 10_000);
        assert_eq!(handler.data().margin, MAX_MARGIN);
        handler.change_margin(Some(Edge::Left), -10_000);
        assert_eq!(handler.data().margin.left, 0);

        assert!(handler.reset_layout_data());
        assert_eq!(handler.data(), LayoutData::default());
    }

    #[test]
    fn test_kind_toggle_and_copy() {
        let mut handler = LayoutHandler::new(LayoutKind::Stack);
        handler.change_gap_size(12);

        assert!(handler.set_kind(LayoutKind::Monocle));
        assert!(!handler.set_kind(LayoutKind::Monocle));
        assert_eq!(handler.data().gap_size, 0);

        assert!(handler.copy_prev_layout_data());
        assert_eq!(handler.data().gap_size, 12);

        assert_eq!(handler.toggle_kind(), LayoutKind::Stack);
        assert_eq!(handler.toggle_kind(), LayoutKind::Monocle);
    }

    #[test]
    fn test_cycle_layout_data() {
        let mut handler = LayoutHandler::default();
        handler.change_gap_size(5);
        assert!(handler.cycle_layout_data(Direction::Forward));
        assert_eq!(handler.data().gap_size, 0);
        assert!(handler.cycle_layout_data(Direction::Backward));
        assert_eq!(handler.data().gap_size, 5);
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("krane-test-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = temp_dir("layout-roundtrip");

        let mut handler = LayoutHandler::new(LayoutKind::BStack);
        for step in 0..DEFAULT_DATA_COUNT as i32 {
            handler.change_gap_size(3 * step + 1);
            handler.change_main_count(step);
            handler.change_main_factor(0.05 * step as f32);
            handler.change_margin(Some(Edge::Right), 7 * step);
            handler.cycle_layout_data(Direction::Forward);
        }

        handler.save_layout(&dir, 3).unwrap();

        let mut fresh = LayoutHandler::new(LayoutKind::BStack);
        assert_eq!(fresh.load_layout(&dir, 3).unwrap(), LayoutKind::BStack);

        let saved: Vec<LayoutData> = handler.layout().data.iter().copied().collect();
        let loaded: Vec<LayoutData> = fresh.layout().data.iter().copied().collect();
        assert_eq!(saved, loaded);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_pads_short_records() {
        let dir = temp_dir("layout-pad");
        std::fs::create_dir_all(&dir).unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&LayoutKind::Horz.tag().to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        LayoutData {
            gap_size: 8,
            ..LayoutData::default()
        }
        .encode(&mut bytes);
        std::fs::write(dir.join("1"), &bytes).unwrap();

        let mut handler = LayoutHandler::default();
        assert_eq!(handler.load_layout(&dir, 1).unwrap(), LayoutKind::Horz);
        assert_eq!(handler.kind(), LayoutKind::Horz);
        assert_eq!(handler.layout().data.len(), DEFAULT_DATA_COUNT);
        assert_eq!(handler.data().gap_size, 8);
        assert_eq!(handler.layout().data[1], LayoutData::default());

        assert!(handler.load_layout(&dir, 2).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
