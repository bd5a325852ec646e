//! Selector Module
//!
//! Ways of picking a client: by position in a workspace, by matching one
//! of its ICCCM strings, or by an arbitrary predicate.

use std::str::FromStr;

use thiserror::Error;

use crate::wm::client::Client;
use crate::wm::geometry::Index;

/// How a string property is compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringMatch {
    Equals(String),
    Contains(String),
}

impl StringMatch {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            StringMatch::Equals(expected) => value == expected,
            StringMatch::Contains(part) => value.contains(part.as_str()),
        }
    }
}

pub type ClientPredicate = Box<dyn Fn(&Client) -> bool>;

pub enum ClientSelector {
    /// Position in the workspace's client order
    AtIndex(Index),
    First,
    Last,
    /// First client of the main area, if the layout has one
    Main,
    Name(StringMatch),
    Class(StringMatch),
    Instance(StringMatch),
    Predicate(ClientPredicate),
}

impl std::fmt::Debug for ClientSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientSelector::AtIndex(index) => f.debug_tuple("AtIndex").field(index).finish(),
            ClientSelector::First => f.write_str("First"),
            ClientSelector::Last => f.write_str("Last"),
            ClientSelector::Main => f.write_str("Main"),
            ClientSelector::Name(matcher) => f.debug_tuple("Name").field(matcher).finish(),
            ClientSelector::Class(matcher) => f.debug_tuple("Class").field(matcher).finish(),
            ClientSelector::Instance(matcher) => f.debug_tuple("Instance").field(matcher).finish(),
            ClientSelector::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl ClientSelector {
    /// Whether this selector picks by workspace position
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            ClientSelector::AtIndex(_)
                | ClientSelector::First
                | ClientSelector::Last
                | ClientSelector::Main
        )
    }

    /// Match a client by its properties; positional selectors never match
    pub fn matches(&self, client: &Client) -> bool {
        match self {
            ClientSelector::Name(matcher) => matcher.matches(client.name()),
            ClientSelector::Class(matcher) => matcher.matches(client.class()),
            ClientSelector::Instance(matcher) => matcher.matches(client.instance()),
            ClientSelector::Predicate(predicate) => predicate(client),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector '{0}', expected name|class|instance followed by = or ~ and a value")]
pub struct SelectorParseError(String);

impl FromStr for ClientSelector {
    type Err = SelectorParseError;

    /// Parse `field=value` (equals) or `field~value` (contains)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SelectorParseError(s.to_string());

        let at = s.find(['=', '~']).ok_or_else(invalid)?;
        let (field, rest) = s.split_at(at);
        let value = rest[1..].to_string();

        if value.is_empty() {
            return Err(invalid());
        }

        let matcher = if rest.starts_with('=') {
            StringMatch::Equals(value)
        } else {
            StringMatch::Contains(value)
        };

        match field.trim() {
            "name" => Ok(ClientSelector::Name(matcher)),
            "class" => Ok(ClientSelector::Class(matcher)),
            "instance" => Ok(ClientSelector::Instance(matcher)),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(
            1,
            2,
            "vim - notes".into(),
            "Alacritty".into(),
            "alacritty".into(),
            None,
            None,
        )
    }

    #[test]
    fn test_parse_selectors() {
        let selector: ClientSelector = "class=Alacritty".parse().unwrap();
        assert!(selector.matches(&client()));

        let selector: ClientSelector = "name~vim".parse().unwrap();
        assert!(selector.matches(&client()));

        let selector: ClientSelector = "instance=Alacritty".parse().unwrap();
        assert!(!selector.matches(&client()));

        assert!("title=foo".parse::<ClientSelector>().is_err());
        assert!("class".parse::<ClientSelector>().is_err());
        assert!("class=".parse::<ClientSelector>().is_err());
    }

    #[test]
    fn test_predicate_and_positional() {
        let selector = ClientSelector::Predicate(Box::new(|client| client.window() == 1));
        assert!(selector.matches(&client()));
        assert!(!selector.is_positional());

        assert!(ClientSelector::Main.is_positional());
        assert!(!ClientSelector::First.matches(&client()));
    }
}
