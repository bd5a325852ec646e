//! IPC server for `kranec` and other command clients
//!
//! One request per connection: the client writes a message, closes its
//! write half and reads the reply. Requests are served on the event loop
//! thread, between display events.

use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use krane_ipc::{MAX_MESSAGE_LEN, Message, ProtocolError, encode_reply, socket_path};
use tracing::{debug, info, warn};

use crate::wm::Model;
use crate::wm::command::{Command, CommandError};
use crate::wm::connection::Connection;

/// Upper bound on how long a client may stall a request
const CLIENT_TIMEOUT: Duration = Duration::from_millis(250);

pub struct IpcServer {
    listener: UnixListener,
    path: PathBuf,
}

impl IpcServer {
    /// Bind the command socket, replacing a stale one
    pub fn bind() -> Result<Self> {
        let path = socket_path();

        // Remove existing socket if present
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale socket {:?}", path))?;
        }

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&path)
            .with_context(|| format!("Failed to bind IPC socket {:?}", path))?;
        listener
            .set_nonblocking(true)
            .context("Failed to make IPC socket non-blocking")?;

        info!("IPC server listening on {:?}", path);
        Ok(Self { listener, path })
    }

    pub fn raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }

    /// Serve every pending connection
    pub fn accept_all<C: Connection>(&self, model: &mut Model<C>) {
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if let Err(e) = serve(stream, model) {
                        warn!("IPC client error: {}", e);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("Accept error: {}", e);
                    break;
                }
            }
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn serve<C: Connection>(mut stream: UnixStream, model: &mut Model<C>) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    stream.set_write_timeout(Some(CLIENT_TIMEOUT))?;

    let mut request = Vec::new();
    (&mut stream)
        .take(MAX_MESSAGE_LEN as u64 + 1)
        .read_to_end(&mut request)?;

    let result = handle_request(&request, model);
    if let Err(e) = &result {
        debug!("IPC request failed: {}", e);
    }

    stream.write_all(&encode_reply(&result))?;
    stream.flush()
}

/// Decode, resolve and run one request
pub fn handle_request<C: Connection>(
    request: &[u8],
    model: &mut Model<C>,
) -> Result<(), CommandError> {
    if request.len() > MAX_MESSAGE_LEN {
        return Err(ProtocolError::TooLong.into());
    }

    let message = Message::decode(request)?;
    debug!("IPC: {} {:?}", message.name, message.arg);

    let command = Command::resolve(&message.name, message.arg.as_deref())?;
    model.execute(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::wm::geometry::Region;
    use crate::wm::testing::MockConnection;

    fn model() -> Model<MockConnection> {
        let conn = MockConnection::new(vec![Region::new(0, 0, 1000, 1000)]);
        Model::new(conn, &Config::default()).unwrap()
    }

    #[test]
    fn test_request_runs_command() {
        let mut model = model();
        let request = Message::new("activate_workspace", Some("3".into())).encode();

        assert_eq!(handle_request(&request, &mut model), Ok(()));
        assert_eq!(model.active_workspace(), 2);
    }

    #[test]
    fn test_malformed_requests_are_reported() {
        let mut model = model();

        assert!(matches!(
            handle_request(b"", &mut model),
            Err(CommandError::Protocol(ProtocolError::Empty))
        ));
        assert!(matches!(
            handle_request(b"frobnicate\0", &mut model),
            Err(CommandError::Unknown(_))
        ));
        assert_eq!(
            handle_request(&vec![b'a'; MAX_MESSAGE_LEN + 1], &mut model),
            Err(CommandError::Protocol(ProtocolError::TooLong))
        );

        let request = Message::new("activate_workspace", Some("42".into())).encode();
        let reply = encode_reply(&handle_request(&request, &mut model));
        assert!(!reply.is_empty());
        assert!(model.is_running());
        assert_eq!(model.active_workspace(), 0);
    }
}
