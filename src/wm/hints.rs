//! Hints Module
//!
//! ICCCM WM_NORMAL_HINTS and WM_HINTS, decoded from their raw 32-bit
//! property payloads, and the size constraint solver used when a client is
//! managed, resized interactively or asks for a new size.

use crate::wm::geometry::{Dim, Window};

// WM_SIZE_HINTS flags
const US_POSITION: u32 = 1 << 0;
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;

// WM_HINTS flags
const INPUT_HINT: u32 = 1 << 0;
const STATE_HINT: u32 = 1 << 1;
const WINDOW_GROUP_HINT: u32 = 1 << 6;
const URGENCY_HINT: u32 = 1 << 8;

/// Size hints (XSizeHints equivalent), normalised to what the solver needs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeHints {
    /// Position was chosen by the user rather than the program
    pub by_user: bool,
    pub min_width: Option<i32>,
    pub min_height: Option<i32>,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
    pub base_width: Option<i32>,
    pub base_height: Option<i32>,
    pub inc_width: Option<i32>,
    pub inc_height: Option<i32>,
    /// Minimum and maximum width/height ratio
    pub min_ratio: Option<f64>,
    pub max_ratio: Option<f64>,
    /// The program asked for min size == max size
    pub fixed: bool,
}

impl SizeHints {
    /// Decode the 18-word WM_NORMAL_HINTS payload
    pub fn from_raw(values: &[u32], min_dim: Dim) -> Option<Self> {
        if values.len() < 18 {
            return None;
        }

        let flags = values[0];
        let positive = |value: u32| Some(value as i32).filter(|&value| value > 0);

        let (raw_min_width, raw_min_height) = if flags & P_MIN_SIZE != 0 {
            (positive(values[5]), positive(values[6]))
        } else {
            (None, None)
        };

        let (max_width, max_height) = if flags & P_MAX_SIZE != 0 {
            (positive(values[7]), positive(values[8]))
        } else {
            (None, None)
        };

        let fixed = matches!(
            (raw_min_width, raw_min_height, max_width, max_height),
            (Some(min_w), Some(min_h), Some(max_w), Some(max_h)) if min_w == max_w && min_h == max_h
        );

        let min_width = raw_min_width.map(|w| w.max(min_dim.w));
        let min_height = raw_min_height.map(|h| h.max(min_dim.h));

        let (inc_width, inc_height) = if flags & P_RESIZE_INC != 0 {
            (
                positive(values[9]).filter(|&w| w < 0xffff),
                positive(values[10]).filter(|&h| h < 0xffff),
            )
        } else {
            (None, None)
        };

        let (min_ratio, max_ratio) = if flags & P_ASPECT != 0 {
            let ratio = |num: u32, den: u32| {
                Some(num as f64 / den as f64).filter(|_| num > 0 && den > 0)
            };

            (ratio(values[11], values[12]), ratio(values[13], values[14]))
        } else {
            (None, None)
        };

        let (base_width, base_height) = if flags & P_BASE_SIZE != 0 {
            (positive(values[15]), positive(values[16]))
        } else {
            (None, None)
        };

        Some(Self {
            by_user: flags & US_POSITION != 0,
            min_width,
            min_height,
            max_width,
            max_height,
            base_width,
            base_height,
            inc_width,
            inc_height,
            min_ratio,
            max_ratio,
            fixed,
        })
    }

    /// Whether the hints pin the window to a single size
    pub fn is_fixed(&self) -> bool {
        self.fixed
            || matches!(
                (self.min_width, self.min_height, self.max_width, self.max_height),
                (Some(min_w), Some(min_h), Some(max_w), Some(max_h)) if min_w == max_w && min_h == max_h
            )
    }

    /// Constrain `dim` in place following ICCCM 4.1.2.3
    pub fn apply(&self, dim: &mut Dim) {
        let mut dest_width = dim.w;
        let mut dest_height = dim.h;

        // the base size is subtracted for aspect and increment computations;
        // min size stands in for it when absent
        let base_width = self.base_width.or(self.min_width).unwrap_or(0);
        let base_height = self.base_height.or(self.min_height).unwrap_or(0);

        if let Some(min_width) = self.min_width {
            dest_width = dest_width.max(min_width);
        }

        if let Some(min_height) = self.min_height {
            dest_height = dest_height.max(min_height);
        }

        if let Some(max_width) = self.max_width {
            dest_width = dest_width.min(max_width);
        }

        if let Some(max_height) = self.max_height {
            dest_height = dest_height.min(max_height);
        }

        let width = (dest_width - base_width).max(0);
        let height = (dest_height - base_height).max(0);

        if let (Some(min_ratio), Some(max_ratio)) = (self.min_ratio, self.max_ratio) {
            if height > 0 && width > 0 {
                let ratio = width as f64 / height as f64;

                if ratio < min_ratio {
                    dest_height = base_height + (width as f64 / min_ratio).round() as i32;
                } else if ratio > max_ratio {
                    dest_width = base_width + (height as f64 * max_ratio).round() as i32;
                }
            }
        }

        if let Some(inc_width) = self.inc_width {
            if dest_width > base_width {
                dest_width -= (dest_width - base_width) % inc_width;
            }
        }

        if let Some(inc_height) = self.inc_height {
            if dest_height > base_height {
                dest_height -= (dest_height - base_height) % inc_height;
            }
        }

        dim.w = dest_width.max(0);
        dim.h = dest_height.max(0);
    }
}

/// WM hints (XWMHints equivalent), restricted to what the model uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hints {
    pub urgent: bool,
    pub input: Option<bool>,
    pub initial_state: Option<u32>,
    pub group: Option<Window>,
}

impl Hints {
    /// Decode the 9-word WM_HINTS payload
    pub fn from_raw(values: &[u32]) -> Option<Self> {
        if values.len() < 9 {
            return None;
        }

        let flags = values[0];

        Some(Self {
            urgent: flags & URGENCY_HINT != 0,
            input: (flags & INPUT_HINT != 0).then_some(values[1] != 0),
            initial_state: (flags & STATE_HINT != 0).then_some(values[2]),
            group: (flags & WINDOW_GROUP_HINT != 0 && values[8] != 0).then_some(values[8]),
        })
    }

    /// Encode back into a WM_HINTS payload, keeping unrelated words from `raw`
    pub fn to_raw(&self, raw: Option<&[u32]>) -> [u32; 9] {
        let mut values = [0u32; 9];

        if let Some(raw) = raw {
            for (value, &old) in values.iter_mut().zip(raw) {
                *value = old;
            }
        }

        let mut flags = values[0] & !(URGENCY_HINT | INPUT_HINT | STATE_HINT | WINDOW_GROUP_HINT);

        if self.urgent {
            flags |= URGENCY_HINT;
        }

        if let Some(input) = self.input {
            flags |= INPUT_HINT;
            values[1] = input as u32;
        }

        if let Some(state) = self.initial_state {
            flags |= STATE_HINT;
            values[2] = state;
        }

        if let Some(group) = self.group {
            flags |= WINDOW_GROUP_HINT;
            values[8] = group;
        }

        values[0] = flags;
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_size_hints(flags: u32) -> [u32; 18] {
        let mut raw = [0u32; 18];
        raw[0] = flags;
        raw
    }

    #[test]
    fn test_size_hints_min_max() {
        let mut raw = raw_size_hints(P_MIN_SIZE | P_MAX_SIZE);
        raw[5] = 100;
        raw[6] = 20;
        raw[7] = 400;
        raw[8] = 300;

        let hints = SizeHints::from_raw(&raw, Dim::new(75, 50)).unwrap();
        assert_eq!(hints.min_width, Some(100));
        assert_eq!(hints.min_height, Some(50));

        let mut dim = Dim::new(10, 1000);
        hints.apply(&mut dim);
        assert_eq!(dim, Dim::new(100, 300));
    }

    #[test]
    fn test_size_hints_increments() {
        let mut raw = raw_size_hints(P_RESIZE_INC | P_BASE_SIZE);
        raw[9] = 10;
        raw[10] = 20;
        raw[15] = 4;
        raw[16] = 6;

        let hints = SizeHints::from_raw(&raw, Dim::new(75, 50)).unwrap();
        let mut dim = Dim::new(109, 95);
        hints.apply(&mut dim);
        assert_eq!(dim, Dim::new(104, 86));
    }

    #[test]
    fn test_tiny_fixed_size_stays_fixed() {
        let mut raw = raw_size_hints(P_MIN_SIZE | P_MAX_SIZE);
        raw[5] = 40;
        raw[6] = 20;
        raw[7] = 40;
        raw[8] = 20;

        let hints = SizeHints::from_raw(&raw, Dim::new(75, 50)).unwrap();
        assert_eq!(hints.min_width, Some(75));
        assert!(hints.is_fixed());

        raw[7] = 80;
        let hints = SizeHints::from_raw(&raw, Dim::new(75, 50)).unwrap();
        assert!(!hints.is_fixed());
    }

    #[test]
    fn test_size_hints_truncated_payload() {
        assert_eq!(SizeHints::from_raw(&[0; 5], Dim::default()), None);
    }

    #[test]
    fn test_wm_hints_roundtrip_urgency() {
        let mut raw = [0u32; 9];
        raw[0] = URGENCY_HINT | INPUT_HINT;
        raw[1] = 1;

        let mut hints = Hints::from_raw(&raw).unwrap();
        assert!(hints.urgent);
        assert_eq!(hints.input, Some(true));

        hints.urgent = false;
        let encoded = hints.to_raw(Some(&raw));
        assert_eq!(encoded[0] & URGENCY_HINT, 0);
        assert_eq!(encoded[0] & INPUT_HINT, INPUT_HINT);
    }
}
