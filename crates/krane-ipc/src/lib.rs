//! Krane IPC Protocol
//!
//! Shared wire format between the `krane` window manager and the `kranec`
//! command client. A message is a command name plus zero or one argument,
//! each token terminated by a NUL byte. The reply is empty on success and
//! carries plain error text otherwise.

use thiserror::Error;

/// Upper bound on the size of a single request
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Socket path for IPC communication
pub fn socket_path() -> std::path::PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .unwrap_or_else(|_| format!("/run/user/{}", unsafe { libc::getuid() }));
    std::path::PathBuf::from(runtime_dir).join("krane.sock")
}

/// Errors produced while decoding a request or one of its arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,

    #[error("message exceeds {MAX_MESSAGE_LEN} bytes")]
    TooLong,

    #[error("message contains a newline")]
    Newline,

    #[error("message is not valid UTF-8")]
    Encoding,

    #[error("expected at most one argument, got {0}")]
    TooManyArguments(usize),

    #[error("missing argument, expected {0}")]
    MissingArgument(ArgKind),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("invalid {kind} '{value}'")]
    InvalidArgument { kind: ArgKind, value: String },
}

// ============================================================================
// Messages
// ============================================================================

/// A decoded request: command name plus optional argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub name: String,
    pub arg: Option<String>,
}

impl Message {
    pub fn new(name: impl Into<String>, arg: Option<String>) -> Self {
        Self {
            name: name.into(),
            arg,
        }
    }

    /// Encode as NUL-terminated tokens
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.name.len() + 2);
        buf.extend_from_slice(self.name.as_bytes());
        buf.push(0);

        if let Some(arg) = &self.arg {
            buf.extend_from_slice(arg.as_bytes());
            buf.push(0);
        }

        buf
    }

    /// Decode NUL-separated tokens; a missing final terminator is tolerated
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() > MAX_MESSAGE_LEN {
            return Err(ProtocolError::TooLong);
        }

        if data.contains(&b'\n') {
            return Err(ProtocolError::Newline);
        }

        let text = std::str::from_utf8(data).map_err(|_| ProtocolError::Encoding)?;
        let mut tokens: Vec<&str> = text.split('\0').collect();

        if tokens.last() == Some(&"") {
            tokens.pop();
        }

        match tokens.as_slice() {
            [] | [""] | ["", ..] => Err(ProtocolError::Empty),
            [name] => Ok(Self::new(*name, None)),
            [name, arg] => Ok(Self::new(*name, Some(arg.to_string()))),
            [_, rest @ ..] => Err(ProtocolError::TooManyArguments(rest.len())),
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// The kind of argument a command expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    None,
    Integer,
    Float,
    /// 1-based small integer, decoded to a 0-based index
    Index,
    /// `a`..`i`, decoded to a 0-based index
    Letter,
    Layout,
    Direction,
}

impl std::fmt::Display for ArgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ArgKind::None => "no argument",
            ArgKind::Integer => "integer",
            ArgKind::Float => "float",
            ArgKind::Index => "index (1-9)",
            ArgKind::Letter => "letter (a-i)",
            ArgKind::Layout => "layout name",
            ArgKind::Direction => "direction (up, right, down, left)",
        })
    }
}

/// Named direction argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

/// A parsed argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    None,
    Integer(i32),
    Float(f32),
    Index(usize),
    Layout(String),
    Direction(Direction),
}

/// Largest index accepted by `Index` and `Letter` arguments
pub const MAX_INDEX: usize = 9;

impl ArgKind {
    /// Parse a raw argument token according to this kind
    pub fn parse(self, raw: Option<&str>) -> Result<Argument, ProtocolError> {
        let value = match (self, raw) {
            (ArgKind::None, None) => return Ok(Argument::None),
            (ArgKind::None, Some(value)) => {
                return Err(ProtocolError::UnexpectedArgument(value.to_string()));
            }
            (kind, None) => return Err(ProtocolError::MissingArgument(kind)),
            (_, Some(value)) => value,
        };

        let invalid = || ProtocolError::InvalidArgument {
            kind: self,
            value: value.to_string(),
        };

        match self {
            ArgKind::None => unreachable!(),
            ArgKind::Integer => value.parse().map(Argument::Integer).map_err(|_| invalid()),
            ArgKind::Float => value
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Argument::Float)
                .ok_or_else(invalid),
            ArgKind::Index => match value.parse::<usize>() {
                Ok(index) if (1..=MAX_INDEX).contains(&index) => Ok(Argument::Index(index - 1)),
                _ => Err(invalid()),
            },
            ArgKind::Letter => match value.as_bytes() {
                [letter @ b'a'..=b'i'] => Ok(Argument::Index((letter - b'a') as usize)),
                _ => Err(invalid()),
            },
            ArgKind::Layout if !value.is_empty() => Ok(Argument::Layout(value.to_string())),
            ArgKind::Layout => Err(invalid()),
            ArgKind::Direction => match value {
                "up" => Ok(Argument::Direction(Direction::Up)),
                "right" => Ok(Argument::Direction(Direction::Right)),
                "down" => Ok(Argument::Direction(Direction::Down)),
                "left" => Ok(Argument::Direction(Direction::Left)),
                _ => Err(invalid()),
            },
        }
    }
}

// ============================================================================
// Replies
// ============================================================================

/// Encode a reply: nothing on success, the error text on failure
pub fn encode_reply<E: std::fmt::Display>(result: &Result<(), E>) -> Vec<u8> {
    match result {
        Ok(()) => Vec::new(),
        Err(err) => err.to_string().into_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_name_only() {
        let msg = Message::decode(b"toggle_float\0").unwrap();
        assert_eq!(msg.name, "toggle_float");
        assert_eq!(msg.arg, None);
    }

    #[test]
    fn test_decode_with_argument() {
        let msg = Message::new("activate_workspace", Some("3".into()));
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(decoded, msg);

        // unterminated trailing token
        let decoded = Message::decode(b"change_gap_size\0-5").unwrap();
        assert_eq!(decoded.arg.as_deref(), Some("-5"));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(Message::decode(b""), Err(ProtocolError::Empty));
        assert_eq!(Message::decode(b"\0foo\0"), Err(ProtocolError::Empty));
        assert_eq!(Message::decode(b"quit\n"), Err(ProtocolError::Newline));
        assert_eq!(
            Message::decode(b"a\0b\0c\0"),
            Err(ProtocolError::TooManyArguments(2))
        );
        assert_eq!(Message::decode(&[0xff, 0]), Err(ProtocolError::Encoding));
    }

    #[test]
    fn test_parse_index_and_letter() {
        assert_eq!(ArgKind::Index.parse(Some("1")), Ok(Argument::Index(0)));
        assert_eq!(ArgKind::Index.parse(Some("9")), Ok(Argument::Index(8)));
        assert!(ArgKind::Index.parse(Some("0")).is_err());
        assert!(ArgKind::Index.parse(Some("10")).is_err());

        assert_eq!(ArgKind::Letter.parse(Some("a")), Ok(Argument::Index(0)));
        assert_eq!(ArgKind::Letter.parse(Some("i")), Ok(Argument::Index(8)));
        assert!(ArgKind::Letter.parse(Some("j")).is_err());
        assert!(ArgKind::Letter.parse(Some("ab")).is_err());
    }

    #[test]
    fn test_parse_numbers_and_directions() {
        assert_eq!(ArgKind::Integer.parse(Some("-12")), Ok(Argument::Integer(-12)));
        assert_eq!(ArgKind::Float.parse(Some("0.05")), Ok(Argument::Float(0.05)));
        assert!(ArgKind::Float.parse(Some("NaN")).is_err());
        assert_eq!(
            ArgKind::Direction.parse(Some("left")),
            Ok(Argument::Direction(Direction::Left))
        );
        assert!(ArgKind::Direction.parse(Some("north")).is_err());
    }

    #[test]
    fn test_argument_presence() {
        assert_eq!(ArgKind::None.parse(None), Ok(Argument::None));
        assert_eq!(
            ArgKind::None.parse(Some("x")),
            Err(ProtocolError::UnexpectedArgument("x".into()))
        );
        assert_eq!(
            ArgKind::Integer.parse(None),
            Err(ProtocolError::MissingArgument(ArgKind::Integer))
        );
    }

    #[test]
    fn test_encode_reply() {
        assert!(encode_reply::<ProtocolError>(&Ok(())).is_empty());
        assert_eq!(encode_reply(&Err(ProtocolError::Empty)), b"empty message".to_vec());
    }
}
