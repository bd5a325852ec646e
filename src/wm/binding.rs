//! Binding Module
//!
//! Key and mouse input descriptions and the tables that map them to
//! actions. Keys are described by keysym name; the display adapter turns
//! names into keycodes when grabbing.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

use crate::wm::command::Command;
use crate::wm::geometry::Direction;

bitflags! {
    /// Modifier keys held during a key or button press
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 2;
        const ALT = 1 << 3;
        const SUPER = 1 << 6;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingParseError {
    #[error("empty key binding")]
    Empty,

    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
}

/// A key chord, e.g. `Mod4-Shift-j`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

fn parse_modifier(name: &str) -> Option<Modifiers> {
    match name {
        "S" | "Shift" => Some(Modifiers::SHIFT),
        "C" | "Ctrl" | "Control" => Some(Modifiers::CONTROL),
        "A" | "Alt" | "Mod1" => Some(Modifiers::ALT),
        "M" | "Super" | "Mod4" => Some(Modifiers::SUPER),
        _ => None,
    }
}

impl FromStr for KeyInput {
    type Err = BindingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // a trailing '-' is the minus key itself
        let (modifiers, key) = match s.strip_suffix("--") {
            Some(rest) => (rest, "minus"),
            None => s.rsplit_once('-').unwrap_or(("", s)),
        };

        if key.is_empty() {
            return Err(BindingParseError::Empty);
        }

        let modifiers = modifiers
            .split('-')
            .filter(|part| !part.is_empty())
            .try_fold(Modifiers::empty(), |acc, part| {
                parse_modifier(part)
                    .map(|modifier| acc | modifier)
                    .ok_or_else(|| BindingParseError::UnknownModifier(part.to_string()))
            })?;

        Ok(KeyInput::new(key, modifiers))
    }
}

impl fmt::Display for KeyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (modifier, name) in [
            (Modifiers::SUPER, "Mod4-"),
            (Modifiers::ALT, "Mod1-"),
            (Modifiers::CONTROL, "Ctrl-"),
            (Modifiers::SHIFT, "Shift-"),
        ] {
            if self.modifiers.contains(modifier) {
                f.write_str(name)?;
            }
        }

        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
    Backward,
    Forward,
}

/// Where a mouse binding applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseInputTarget {
    Root,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseInput {
    pub target: MouseInputTarget,
    pub button: Button,
    pub modifiers: Modifiers,
}

impl MouseInput {
    pub fn new(target: MouseInputTarget, button: Button, modifiers: Modifiers) -> Self {
        Self {
            target,
            button,
            modifiers,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    Command(Command),
    Spawn(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseAction {
    Move,
    Resize,
    ToggleFloat,
    Command(Command),
}

/// Default key chords and the command lines they run
const DEFAULT_KEYS: &[(&str, &str)] = &[
    ("Mod4-Shift-q", "quit"),
    ("Mod4-q", "kill_focus"),
    ("Mod4-j", "cycle_focus_forward"),
    ("Mod4-k", "cycle_focus_backward"),
    ("Mod4-Shift-j", "drag_focus_forward"),
    ("Mod4-Shift-k", "drag_focus_backward"),
    ("Mod4-Ctrl-j", "rotate_clients_forward"),
    ("Mod4-Ctrl-k", "rotate_clients_backward"),
    ("Mod4-Shift-r", "reverse_clients"),
    ("Mod4-m", "jump_main"),
    ("Mod4-comma", "jump_first"),
    ("Mod4-period", "jump_last"),
    ("Mod4-BackSpace", "jump_back"),
    ("Mod4-u", "jump_urgent"),
    ("Mod4-space", "toggle_float"),
    ("Mod4-f", "toggle_fullscreen"),
    ("Mod4-Shift-s", "toggle_sticky"),
    ("Mod4-Shift-f", "toggle_contained"),
    ("Mod4-Shift-i", "toggle_invincible"),
    ("Mod4-Shift-p", "toggle_producing"),
    ("Mod4-Shift-d", "toggle_disown"),
    ("Mod4-i", "iconify_focus"),
    ("Mod4-Shift-u", "deiconify_pop"),
    ("Mod4-c", "center_focus"),
    ("Mod4-Ctrl-h", "snap_focus left"),
    ("Mod4-Ctrl-l", "snap_focus right"),
    ("Mod4-Ctrl-Up", "snap_focus up"),
    ("Mod4-Ctrl-Down", "snap_focus down"),
    ("Mod4-Left", "nudge_focus left"),
    ("Mod4-Right", "nudge_focus right"),
    ("Mod4-Up", "nudge_focus up"),
    ("Mod4-Down", "nudge_focus down"),
    ("Mod4-Shift-Right", "grow_focus right"),
    ("Mod4-Shift-Down", "grow_focus down"),
    ("Mod4-Shift-Left", "shrink_focus right"),
    ("Mod4-Shift-Up", "shrink_focus down"),
    ("Mod4-Shift-equal", "float_retain_region"),
    ("Mod4-Tab", "toggle_layout"),
    ("Mod4-s", "set_layout float"),
    ("Mod4-t", "set_layout stack"),
    ("Mod4-z", "set_layout monocle"),
    ("Mod4-b", "set_layout bstack"),
    ("Mod4-p", "set_layout paper"),
    ("Mod4-Shift-c", "set_layout center"),
    ("Mod4-equal", "change_main_count 1"),
    ("Mod4-minus", "change_main_count -1"),
    ("Mod4-l", "change_main_factor 0.05"),
    ("Mod4-h", "change_main_factor -0.05"),
    ("Mod4-Shift-bracketright", "change_gap_size 2"),
    ("Mod4-Shift-bracketleft", "change_gap_size -2"),
    ("Mod4-Shift-0", "reset_gap_size"),
    ("Mod4-bracketright", "change_margin 5"),
    ("Mod4-bracketleft", "change_margin -5"),
    ("Mod4-0", "reset_margin"),
    ("Mod4-Shift-Tab", "cycle_layout_data_forward"),
    ("Mod4-Escape", "toggle_workspace"),
    ("Mod4-Ctrl-Escape", "toggle_context"),
    ("Mod4-Shift-backslash", "toggle_struts"),
];

const DEFAULT_SPAWNS: &[(&str, &str)] = &[("Mod4-Return", "xterm")];

#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    bindings: HashMap<KeyInput, KeyAction>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in bindings, including `Mod4-<n>` / `Mod4-Shift-<n>`
    /// for workspace activation and movement
    pub fn defaults() -> Self {
        let mut bindings = Self::new();

        for (key, line) in DEFAULT_KEYS {
            if let (Ok(input), Ok(command)) = (key.parse(), Command::parse_line(line)) {
                bindings.insert(input, KeyAction::Command(command));
            }
        }

        for (key, cmd) in DEFAULT_SPAWNS {
            if let Ok(input) = key.parse() {
                bindings.insert(input, KeyAction::Spawn(cmd.to_string()));
            }
        }

        for number in 1..=9 {
            let key = number.to_string();

            bindings.insert(
                KeyInput::new(&key, Modifiers::SUPER),
                KeyAction::Command(Command::ActivateWorkspace(number - 1)),
            );
            bindings.insert(
                KeyInput::new(&key, Modifiers::SUPER | Modifiers::SHIFT),
                KeyAction::Command(Command::MoveFocusToWorkspace(number - 1)),
            );
        }

        bindings
    }

    /// Bind a chord to a command line such as `snap_focus left`
    pub fn bind_command(&mut self, key: &str, line: &str) -> anyhow::Result<()> {
        let input: KeyInput = key.parse()?;
        let command = Command::parse_line(line)?;
        self.insert(input, KeyAction::Command(command));
        Ok(())
    }

    pub fn bind_spawn(&mut self, key: &str, cmd: &str) -> anyhow::Result<()> {
        let input: KeyInput = key.parse()?;
        self.insert(input, KeyAction::Spawn(cmd.to_string()));
        Ok(())
    }

    pub fn insert(&mut self, input: KeyInput, action: KeyAction) {
        self.bindings.insert(input, action);
    }

    pub fn get(&self, input: &KeyInput) -> Option<&KeyAction> {
        self.bindings.get(input)
    }

    pub fn inputs(&self) -> Vec<KeyInput> {
        self.bindings.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MouseBindings {
    bindings: HashMap<MouseInput, MouseAction>,
}

impl Default for MouseBindings {
    fn default() -> Self {
        use MouseInputTarget::{Client, Root};

        let bindings = [
            (MouseInput::new(Client, Button::Left, Modifiers::SUPER), MouseAction::Move),
            (MouseInput::new(Client, Button::Right, Modifiers::SUPER), MouseAction::Resize),
            (
                MouseInput::new(Client, Button::Middle, Modifiers::SUPER),
                MouseAction::ToggleFloat,
            ),
            (
                MouseInput::new(Root, Button::ScrollUp, Modifiers::SUPER),
                MouseAction::Command(Command::ActivateNextWorkspace(Direction::Backward)),
            ),
            (
                MouseInput::new(Root, Button::ScrollDown, Modifiers::SUPER),
                MouseAction::Command(Command::ActivateNextWorkspace(Direction::Forward)),
            ),
        ];

        Self {
            bindings: bindings.into_iter().collect(),
        }
    }
}

impl MouseBindings {
    pub fn get(&self, input: &MouseInput) -> Option<MouseAction> {
        self.bindings.get(input).copied()
    }

    pub fn inputs(&self) -> Vec<MouseInput> {
        self.bindings.keys().copied().collect()
    }
}
