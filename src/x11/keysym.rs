//! Keysym names and the server's keyboard mapping.
//!
//! Printable ASCII keysyms share their code point, so single-character
//! names need no table entry.

use std::collections::HashMap;

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, Keycode, Keysym};

const NAMED_KEYSYMS: &[(&str, Keysym)] = &[
    ("space", 0x0020),
    ("exclam", 0x0021),
    ("apostrophe", 0x0027),
    ("comma", 0x002c),
    ("minus", 0x002d),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("semicolon", 0x003b),
    ("equal", 0x003d),
    ("bracketleft", 0x005b),
    ("backslash", 0x005c),
    ("bracketright", 0x005d),
    ("grave", 0x0060),
    ("bar", 0x007c),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Prior", 0xff55),
    ("Next", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Insert", 0xff63),
    ("Menu", 0xff67),
    ("F1", 0xffbe),
    ("F2", 0xffbf),
    ("F3", 0xffc0),
    ("F4", 0xffc1),
    ("F5", 0xffc2),
    ("F6", 0xffc3),
    ("F7", 0xffc4),
    ("F8", 0xffc5),
    ("F9", 0xffc6),
    ("F10", 0xffc7),
    ("F11", 0xffc8),
    ("F12", 0xffc9),
    ("Delete", 0xffff),
    ("XF86MonBrightnessUp", 0x1008ff02),
    ("XF86MonBrightnessDown", 0x1008ff03),
    ("XF86AudioLowerVolume", 0x1008ff11),
    ("XF86AudioMute", 0x1008ff12),
    ("XF86AudioRaiseVolume", 0x1008ff13),
    ("XF86AudioPlay", 0x1008ff14),
    ("XF86AudioStop", 0x1008ff15),
    ("XF86AudioPrev", 0x1008ff16),
    ("XF86AudioNext", 0x1008ff17),
];

pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    if let Some(&(_, keysym)) = NAMED_KEYSYMS.iter().find(|(n, _)| *n == name) {
        return Some(keysym);
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_graphic() => Some(c.to_ascii_lowercase() as Keysym),
        _ => None,
    }
}

pub fn name_from_keysym(keysym: Keysym) -> Option<String> {
    if let Some((name, _)) = NAMED_KEYSYMS.iter().find(|(_, k)| *k == keysym) {
        return Some(name.to_string());
    }

    char::from_u32(keysym)
        .filter(char::is_ascii_graphic)
        .map(String::from)
}

/// Keycode to keysym table, refreshed on MappingNotify
#[derive(Debug, Default)]
pub struct KeyMap {
    by_keycode: HashMap<Keycode, Keysym>,
    by_keysym: HashMap<Keysym, Vec<Keycode>>,
}

impl KeyMap {
    pub fn load<C: Connection>(conn: &C) -> Result<Self> {
        let setup = conn.setup();
        let min = setup.min_keycode;
        let count = setup.max_keycode - min + 1;

        let reply = conn
            .get_keyboard_mapping(min, count)?
            .reply()
            .context("Failed to get keyboard mapping")?;

        Ok(Self::from_mapping(
            min,
            reply.keysyms_per_keycode as usize,
            &reply.keysyms,
        ))
    }

    pub fn from_mapping(min_keycode: Keycode, per_keycode: usize, keysyms: &[Keysym]) -> Self {
        let mut map = Self::default();

        if per_keycode == 0 {
            return map;
        }

        for (offset, row) in keysyms.chunks(per_keycode).enumerate() {
            let Ok(offset) = Keycode::try_from(offset) else {
                break;
            };
            let keycode = min_keycode.saturating_add(offset);

            // unshifted and shifted columns
            for (column, &keysym) in row.iter().take(2).enumerate() {
                if keysym == 0 {
                    continue;
                }

                if column == 0 {
                    map.by_keycode.insert(keycode, keysym);
                }

                let keycodes = map.by_keysym.entry(keysym).or_default();
                if !keycodes.contains(&keycode) {
                    keycodes.push(keycode);
                }
            }
        }

        map
    }

    pub fn keycodes(&self, name: &str) -> &[Keycode] {
        keysym_from_name(name)
            .and_then(|keysym| self.by_keysym.get(&keysym))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn name(&self, keycode: Keycode) -> Option<String> {
        self.by_keycode.get(&keycode).copied().and_then(name_from_keysym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_ascii_keysyms() {
        assert_eq!(keysym_from_name("Return"), Some(0xff0d));
        assert_eq!(keysym_from_name("j"), Some(0x6a));
        assert_eq!(keysym_from_name("J"), Some(0x6a));
        assert_eq!(keysym_from_name("7"), Some(0x37));
        assert_eq!(keysym_from_name("Hyper_L"), None);

        assert_eq!(name_from_keysym(0xff09).as_deref(), Some("Tab"));
        assert_eq!(name_from_keysym(0x2d).as_deref(), Some("minus"));
        assert_eq!(name_from_keysym(0x71).as_deref(), Some("q"));
    }

    #[test]
    fn test_keymap_columns() {
        // keycode 10: '1' / '!', keycode 11: 'q' / 'Q'
        let map = KeyMap::from_mapping(10, 2, &[0x31, 0x21, 0x71, 0x51]);

        assert_eq!(map.name(10).as_deref(), Some("1"));
        assert_eq!(map.name(11).as_deref(), Some("q"));
        assert_eq!(map.keycodes("q"), &[11]);
        assert_eq!(map.keycodes("exclam"), &[10]);
        assert!(map.keycodes("Return").is_empty());
    }
}
