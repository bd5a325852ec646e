//! Rules Module
//!
//! Placement rules embedded in a window's ICCCM instance name, e.g.
//! `krane:!fW3Slt.` (not floating, workspace 3, snapped top-left).

use crate::wm::geometry::{Edge, Index};

/// Prefix that marks an instance name as carrying rules
pub const RULE_PREFIX: &str = "krane:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules {
    pub partition: Option<Index>,
    pub context: Option<Index>,
    pub workspace: Option<Index>,
    pub float: Option<bool>,
    pub fullscreen: Option<bool>,
    pub center: Option<bool>,
    pub focus: Option<bool>,
    pub snap_edges: Vec<Edge>,
}

impl Rules {
    /// Parse the rules of an instance name; names without the prefix
    /// carry no rules
    pub fn parse(instance: &str) -> Self {
        let mut rules = Rules::default();

        let Some(flags) = instance.strip_prefix(RULE_PREFIX) else {
            return rules;
        };

        let mut invert = false;
        let mut chars = flags.chars();

        while let Some(flag) = chars.next() {
            match flag {
                '!' => {
                    invert = true;
                    continue;
                }
                'P' | 'C' | 'W' => {
                    let index = chars
                        .next()
                        .and_then(|digit| digit.to_digit(10))
                        .map(|digit| digit as Index);

                    if let Some(index) = index {
                        match flag {
                            'P' => rules.partition = Some(index),
                            'C' => rules.context = Some(index),
                            _ => rules.workspace = Some(index),
                        }
                    }
                }
                'f' => rules.float = Some(!invert),
                'F' => rules.fullscreen = Some(!invert),
                'c' => rules.center = Some(!invert),
                '@' => rules.focus = Some(!invert),
                'S' => {
                    for edge in chars.by_ref() {
                        let edge = match edge {
                            'l' => Edge::Left,
                            't' => Edge::Top,
                            'r' => Edge::Right,
                            'b' => Edge::Bottom,
                            '.' => break,
                            _ => continue,
                        };

                        if !rules.snap_edges.contains(&edge) {
                            rules.snap_edges.push(edge);
                        }
                    }
                }
                _ => {}
            }

            invert = false;
        }

        rules
    }

    pub fn float(&self) -> bool {
        self.float.unwrap_or(false)
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen.unwrap_or(false)
    }

    pub fn center(&self) -> bool {
        self.center.unwrap_or(false)
    }

    pub fn focus(&self) -> bool {
        self.focus.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_prefix_no_rules() {
        assert_eq!(Rules::parse("firefox"), Rules::default());
        assert_eq!(Rules::parse("krane"), Rules::default());
        assert_eq!(Rules::parse(""), Rules::default());
    }

    #[test]
    fn test_flags_and_negation() {
        let rules = Rules::parse("krane:f!Fc");
        assert_eq!(rules.float, Some(true));
        assert_eq!(rules.fullscreen, Some(false));
        assert_eq!(rules.center, Some(true));
        assert!(rules.focus());

        let rules = Rules::parse("krane:!@");
        assert_eq!(rules.focus, Some(false));
    }

    #[test]
    fn test_targets() {
        let rules = Rules::parse("krane:P1C2W3");
        assert_eq!(rules.partition, Some(1));
        assert_eq!(rules.context, Some(2));
        assert_eq!(rules.workspace, Some(3));

        let rules = Rules::parse("krane:Wxf");
        assert_eq!(rules.workspace, None);
        assert_eq!(rules.float, Some(true));
    }

    #[test]
    fn test_snap_edges() {
        let rules = Rules::parse("krane:Sltx.F");
        assert_eq!(rules.snap_edges, vec![Edge::Left, Edge::Top]);
        assert_eq!(rules.fullscreen, Some(true));

        // unterminated run swallows the rest
        let rules = Rules::parse("krane:SbrF");
        assert_eq!(rules.snap_edges, vec![Edge::Bottom, Edge::Right]);
        assert_eq!(rules.fullscreen, None);
    }

    #[test]
    fn test_case_sensitive_and_unknown() {
        let rules = Rules::parse("krane:xyzw1");
        assert_eq!(rules, Rules::default());
    }
}
