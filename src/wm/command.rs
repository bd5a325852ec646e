//! Command Module
//!
//! The closed set of user operations and the name table both key bindings
//! and IPC messages resolve through.

use krane_ipc::{ArgKind, Argument, ProtocolError};
use thiserror::Error;

use crate::wm::geometry::{Direction, Edge, Index};
use crate::wm::layout::LayoutKind;

/// Errors reported back to whoever issued a command
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("unknown layout '{0}'")]
    UnknownLayout(String),

    #[error("index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("{0}")]
    Layout(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Quit,
    KillFocus,

    JumpFirst,
    JumpLast,
    JumpMain,
    JumpIndex(Index),
    JumpBack,
    JumpUrgent,

    CycleFocus(Direction),
    DragFocus(Direction),
    RotateClients(Direction),
    ShuffleMain(Direction),
    ShuffleStack(Direction),
    ReverseClients,

    CenterFocus,
    SnapFocus(Edge),
    NudgeFocus(Edge),
    GrowFocus(Edge),
    ShrinkFocus(Edge),

    ToggleFloat,
    ToggleFullscreen,
    ToggleSticky,
    ToggleContained,
    ToggleInvincible,
    ToggleProducing,
    ToggleIconifyable,
    ToggleDisown,
    IconifyFocus,
    DeiconifyPop,
    DeiconifyAll,
    FloatRetainRegion,

    SetLayout(LayoutKind),
    ToggleLayout,
    CycleLayoutData(Direction),
    CopyPrevLayoutData,
    ResetLayoutData,
    ChangeGapSize(i32),
    ResetGapSize,
    ChangeMainCount(i32),
    ChangeMainFactor(f32),
    /// `None` changes every edge
    ChangeMargin(Option<Edge>, i32),
    ResetMargin,
    SaveLayout(Index),
    LoadLayout(Index),

    ActivateWorkspace(Index),
    ActivateNextWorkspace(Direction),
    ToggleWorkspace,
    MoveFocusToWorkspace(Index),
    MoveFocusToNextWorkspace(Direction),
    ActivateContext(Index),
    ToggleContext,
    MoveFocusToContext(Index),
    ToggleStruts,
}

type Builder = fn(Argument) -> Result<Command, CommandError>;

struct CommandEntry {
    name: &'static str,
    arg: ArgKind,
    build: Builder,
}

const fn entry(name: &'static str, arg: ArgKind, build: Builder) -> CommandEntry {
    CommandEntry { name, arg, build }
}

fn edge(arg: Argument) -> Edge {
    match arg {
        Argument::Direction(krane_ipc::Direction::Up) => Edge::Top,
        Argument::Direction(krane_ipc::Direction::Down) => Edge::Bottom,
        Argument::Direction(krane_ipc::Direction::Left) => Edge::Left,
        _ => Edge::Right,
    }
}

fn int(arg: Argument) -> i32 {
    match arg {
        Argument::Integer(value) => value,
        _ => 0,
    }
}

fn index(arg: Argument) -> Index {
    match arg {
        Argument::Index(index) => index,
        _ => 0,
    }
}

const FORWARD: Direction = Direction::Forward;
const BACKWARD: Direction = Direction::Backward;

static COMMANDS: &[CommandEntry] = &[
    entry("quit", ArgKind::None, |_| Ok(Command::Quit)),
    entry("kill_focus", ArgKind::None, |_| Ok(Command::KillFocus)),
    entry("jump_first", ArgKind::None, |_| Ok(Command::JumpFirst)),
    entry("jump_last", ArgKind::None, |_| Ok(Command::JumpLast)),
    entry("jump_main", ArgKind::None, |_| Ok(Command::JumpMain)),
    entry("jump_index", ArgKind::Index, |arg| Ok(Command::JumpIndex(index(arg)))),
    entry("jump_back", ArgKind::None, |_| Ok(Command::JumpBack)),
    entry("jump_urgent", ArgKind::None, |_| Ok(Command::JumpUrgent)),
    entry("cycle_focus_forward", ArgKind::None, |_| Ok(Command::CycleFocus(FORWARD))),
    entry("cycle_focus_backward", ArgKind::None, |_| Ok(Command::CycleFocus(BACKWARD))),
    entry("drag_focus_forward", ArgKind::None, |_| Ok(Command::DragFocus(FORWARD))),
    entry("drag_focus_backward", ArgKind::None, |_| Ok(Command::DragFocus(BACKWARD))),
    entry("rotate_clients_forward", ArgKind::None, |_| Ok(Command::RotateClients(FORWARD))),
    entry("rotate_clients_backward", ArgKind::None, |_| Ok(Command::RotateClients(BACKWARD))),
    entry("shuffle_main_forward", ArgKind::None, |_| Ok(Command::ShuffleMain(FORWARD))),
    entry("shuffle_main_backward", ArgKind::None, |_| Ok(Command::ShuffleMain(BACKWARD))),
    entry("shuffle_stack_forward", ArgKind::None, |_| Ok(Command::ShuffleStack(FORWARD))),
    entry("shuffle_stack_backward", ArgKind::None, |_| Ok(Command::ShuffleStack(BACKWARD))),
    entry("reverse_clients", ArgKind::None, |_| Ok(Command::ReverseClients)),
    entry("center_focus", ArgKind::None, |_| Ok(Command::CenterFocus)),
    entry("snap_focus", ArgKind::Direction, |arg| Ok(Command::SnapFocus(edge(arg)))),
    entry("nudge_focus", ArgKind::Direction, |arg| Ok(Command::NudgeFocus(edge(arg)))),
    entry("grow_focus", ArgKind::Direction, |arg| Ok(Command::GrowFocus(edge(arg)))),
    entry("shrink_focus", ArgKind::Direction, |arg| Ok(Command::ShrinkFocus(edge(arg)))),
    entry("toggle_float", ArgKind::None, |_| Ok(Command::ToggleFloat)),
    entry("toggle_fullscreen", ArgKind::None, |_| Ok(Command::ToggleFullscreen)),
    entry("toggle_sticky", ArgKind::None, |_| Ok(Command::ToggleSticky)),
    entry("toggle_contained", ArgKind::None, |_| Ok(Command::ToggleContained)),
    entry("toggle_invincible", ArgKind::None, |_| Ok(Command::ToggleInvincible)),
    entry("toggle_producing", ArgKind::None, |_| Ok(Command::ToggleProducing)),
    entry("toggle_iconifyable", ArgKind::None, |_| Ok(Command::ToggleIconifyable)),
    entry("toggle_disown", ArgKind::None, |_| Ok(Command::ToggleDisown)),
    entry("iconify_focus", ArgKind::None, |_| Ok(Command::IconifyFocus)),
    entry("deiconify_pop", ArgKind::None, |_| Ok(Command::DeiconifyPop)),
    entry("deiconify_all", ArgKind::None, |_| Ok(Command::DeiconifyAll)),
    entry("float_retain_region", ArgKind::None, |_| Ok(Command::FloatRetainRegion)),
    entry("set_layout", ArgKind::Layout, |arg| match arg {
        Argument::Layout(name) => LayoutKind::from_name(&name)
            .map(Command::SetLayout)
            .ok_or(CommandError::UnknownLayout(name)),
        _ => Err(CommandError::UnknownLayout(String::new())),
    }),
    entry("toggle_layout", ArgKind::None, |_| Ok(Command::ToggleLayout)),
    entry("cycle_layout_data_forward", ArgKind::None, |_| Ok(Command::CycleLayoutData(FORWARD))),
    entry("cycle_layout_data_backward", ArgKind::None, |_| Ok(Command::CycleLayoutData(BACKWARD))),
    entry("copy_prev_layout_data", ArgKind::None, |_| Ok(Command::CopyPrevLayoutData)),
    entry("reset_layout_data", ArgKind::None, |_| Ok(Command::ResetLayoutData)),
    entry("change_gap_size", ArgKind::Integer, |arg| Ok(Command::ChangeGapSize(int(arg)))),
    entry("reset_gap_size", ArgKind::None, |_| Ok(Command::ResetGapSize)),
    entry("change_main_count", ArgKind::Integer, |arg| Ok(Command::ChangeMainCount(int(arg)))),
    entry("change_main_factor", ArgKind::Float, |arg| match arg {
        Argument::Float(value) => Ok(Command::ChangeMainFactor(value)),
        _ => Ok(Command::ChangeMainFactor(0.0)),
    }),
    entry("change_margin", ArgKind::Integer, |arg| Ok(Command::ChangeMargin(None, int(arg)))),
    entry("change_margin_top", ArgKind::Integer, |arg| {
        Ok(Command::ChangeMargin(Some(Edge::Top), int(arg)))
    }),
    entry("change_margin_right", ArgKind::Integer, |arg| {
        Ok(Command::ChangeMargin(Some(Edge::Right), int(arg)))
    }),
    entry("change_margin_bottom", ArgKind::Integer, |arg| {
        Ok(Command::ChangeMargin(Some(Edge::Bottom), int(arg)))
    }),
    entry("change_margin_left", ArgKind::Integer, |arg| {
        Ok(Command::ChangeMargin(Some(Edge::Left), int(arg)))
    }),
    entry("reset_margin", ArgKind::None, |_| Ok(Command::ResetMargin)),
    entry("save_layout", ArgKind::Index, |arg| Ok(Command::SaveLayout(index(arg)))),
    entry("load_layout", ArgKind::Index, |arg| Ok(Command::LoadLayout(index(arg)))),
    entry("activate_workspace", ArgKind::Index, |arg| Ok(Command::ActivateWorkspace(index(arg)))),
    entry("activate_next_workspace", ArgKind::None, |_| Ok(Command::ActivateNextWorkspace(FORWARD))),
    entry("activate_prev_workspace", ArgKind::None, |_| Ok(Command::ActivateNextWorkspace(BACKWARD))),
    entry("toggle_workspace", ArgKind::None, |_| Ok(Command::ToggleWorkspace)),
    entry("move_focus_to_workspace", ArgKind::Index, |arg| {
        Ok(Command::MoveFocusToWorkspace(index(arg)))
    }),
    entry("move_focus_to_next_workspace", ArgKind::None, |_| {
        Ok(Command::MoveFocusToNextWorkspace(FORWARD))
    }),
    entry("move_focus_to_prev_workspace", ArgKind::None, |_| {
        Ok(Command::MoveFocusToNextWorkspace(BACKWARD))
    }),
    entry("activate_context", ArgKind::Letter, |arg| Ok(Command::ActivateContext(index(arg)))),
    entry("toggle_context", ArgKind::None, |_| Ok(Command::ToggleContext)),
    entry("move_focus_to_context", ArgKind::Letter, |arg| {
        Ok(Command::MoveFocusToContext(index(arg)))
    }),
    entry("toggle_struts", ArgKind::None, |_| Ok(Command::ToggleStruts)),
];

impl Command {
    /// Resolve a command name and its raw argument
    pub fn resolve(name: &str, arg: Option<&str>) -> Result<Command, CommandError> {
        let entry = COMMANDS
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))?;

        let argument = entry.arg.parse(arg)?;
        (entry.build)(argument)
    }

    /// Resolve a whitespace-separated `name [arg]` string, as written in
    /// the config file
    pub fn parse_line(line: &str) -> Result<Command, CommandError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().unwrap_or_default();
        let arg = tokens.next();

        if tokens.next().is_some() {
            return Err(ProtocolError::TooManyArguments(2).into());
        }

        Self::resolve(name, arg)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        COMMANDS.iter().map(|entry| entry.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_simple() {
        assert_eq!(Command::resolve("quit", None), Ok(Command::Quit));
        assert_eq!(
            Command::resolve("cycle_focus_backward", None),
            Ok(Command::CycleFocus(Direction::Backward))
        );
    }

    #[test]
    fn test_resolve_arguments() {
        assert_eq!(
            Command::resolve("activate_workspace", Some("3")),
            Ok(Command::ActivateWorkspace(2))
        );
        assert_eq!(
            Command::resolve("activate_context", Some("b")),
            Ok(Command::ActivateContext(1))
        );
        assert_eq!(
            Command::resolve("change_margin_left", Some("-10")),
            Ok(Command::ChangeMargin(Some(Edge::Left), -10))
        );
        assert_eq!(
            Command::resolve("snap_focus", Some("up")),
            Ok(Command::SnapFocus(Edge::Top))
        );
        assert_eq!(
            Command::resolve("set_layout", Some("monocle")),
            Ok(Command::SetLayout(LayoutKind::Monocle))
        );
    }

    #[test]
    fn test_resolve_errors() {
        assert_eq!(
            Command::resolve("frobnicate", None),
            Err(CommandError::Unknown("frobnicate".into()))
        );
        assert_eq!(
            Command::resolve("set_layout", Some("spiral")),
            Err(CommandError::UnknownLayout("spiral".into()))
        );
        assert!(matches!(
            Command::resolve("quit", Some("now")),
            Err(CommandError::Protocol(ProtocolError::UnexpectedArgument(_)))
        ));
        assert!(matches!(
            Command::resolve("activate_workspace", Some("0")),
            Err(CommandError::Protocol(ProtocolError::InvalidArgument { .. }))
        ));
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            Command::parse_line("change_gap_size 5"),
            Ok(Command::ChangeGapSize(5))
        );
        assert!(Command::parse_line("change_gap_size 5 6").is_err());
        assert!(Command::parse_line("").is_err());
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Command::names().collect();
        let len = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), len);
    }
}
