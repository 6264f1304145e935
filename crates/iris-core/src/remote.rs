//! Remote control of a viewer over a local TCP socket.
//!
//! One plain-text message per connection, at most
//! `REMOTE_MESSAGE_MAX_BYTES` long:
//!
//! - `update <path>`: (re)load `<path>`;
//! - `stop`: terminate the listener.
//!
//! There is no authentication; the listener only binds the loopback
//! interface.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::consts::REMOTE_MESSAGE_MAX_BYTES;
use crate::error::{IrisError, Result};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteCommand {
    Update(PathBuf),
    Stop,
}

impl RemoteCommand {
    pub fn parse(message: &str) -> Result<Self> {
        let message = message.trim();
        if message == "stop" {
            return Ok(Self::Stop);
        }
        match message.split_once(char::is_whitespace) {
            Some(("update", path)) if !path.trim().is_empty() => {
                Ok(Self::Update(PathBuf::from(path.trim())))
            }
            _ => Err(IrisError::Protocol(format!("unknown message {:?}", message))),
        }
    }

    pub fn to_message(&self) -> String {
        match self {
            Self::Update(path) => format!("update {}", path.display()),
            Self::Stop => "stop".to_string(),
        }
    }
}

/// What a viewer should do with an `update` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateAction {
    /// The open file changed on disk: reload it in place.
    Reload(PathBuf),
    /// Another file was requested: open it.
    Load(PathBuf),
    /// The open file is locked by the user: keep what is shown.
    Ignored,
}

/// The file a viewer shows and whether automatic reloads are locked out.
#[derive(Debug, Default)]
pub struct ViewerState {
    current: Mutex<Option<PathBuf>>,
    locked: AtomicBool,
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    pub fn open(&self, path: &Path) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(absolute(path));
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    /// Flip the lock, returning the new state.
    pub fn toggle_lock(&self) -> bool {
        !self.locked.fetch_xor(true, Ordering::SeqCst)
    }

    /// Decide how to honor `update <path>`. A different file is always
    /// loaded; the open one is reloaded unless locked.
    pub fn handle_update(&self, path: &Path) -> UpdateAction {
        let requested = absolute(path);
        let Ok(mut current) = self.current.lock() else {
            return UpdateAction::Ignored;
        };
        if current.as_deref() == Some(requested.as_path()) {
            if self.is_locked() {
                UpdateAction::Ignored
            } else {
                UpdateAction::Reload(requested)
            }
        } else {
            *current = Some(requested.clone());
            UpdateAction::Load(requested)
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Background thread accepting remote-control messages on localhost.
pub struct Listener {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Listener {
    /// Bind `127.0.0.1:port` (0 picks a free port) and call `handler` for
    /// every `update` message until `stop` is received.
    pub fn spawn<F>(port: u16, mut handler: F) -> Result<Self>
    where
        F: FnMut(RemoteCommand) + Send + 'static,
    {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))?;
        let addr = listener.local_addr()?;
        info!(%addr, "Remote-control listener started");

        let handle = std::thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };
                let peer = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "?".into());
                let message = match read_message(stream) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(%peer, error = %e, "Failed to read message");
                        continue;
                    }
                };
                info!(%peer, %message, "Message received");
                match RemoteCommand::parse(&message) {
                    Ok(RemoteCommand::Stop) => break,
                    Ok(command) => handler(command),
                    Err(e) => warn!(%peer, error = %e, "Message ignored"),
                }
            }
            info!("Remote-control listener stopped");
        });
        Ok(Self { addr, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the listener to receive `stop`.
    pub fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| IrisError::Protocol("listener thread panicked".into()))
    }
}

fn read_message(stream: TcpStream) -> Result<String> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut buf = Vec::with_capacity(REMOTE_MESSAGE_MAX_BYTES);
    stream
        .take(REMOTE_MESSAGE_MAX_BYTES as u64)
        .read_to_end(&mut buf)?;
    String::from_utf8(buf).map_err(|e| IrisError::Protocol(format!("message is not UTF-8: {}", e)))
}

/// Send one message to a listener.
pub fn send_message(addr: impl ToSocketAddrs, message: &str) -> Result<()> {
    if message.len() > REMOTE_MESSAGE_MAX_BYTES {
        return Err(IrisError::Protocol(format!(
            "message of {} bytes exceeds {} bytes",
            message.len(),
            REMOTE_MESSAGE_MAX_BYTES
        )));
    }
    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(message.as_bytes())?;
    stream.flush()?;
    stream.shutdown(Shutdown::Write)?;
    debug!(message, "Message sent");
    Ok(())
}

/// Send `message` to the listener on `127.0.0.1:port`.
pub fn send_to_port(port: u16, message: &str) -> Result<()> {
    send_message((Ipv4Addr::LOCALHOST, port), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(RemoteCommand::parse("stop").unwrap(), RemoteCommand::Stop);
        assert_eq!(
            RemoteCommand::parse("update /data/cube.m.cube\n").unwrap(),
            RemoteCommand::Update(PathBuf::from("/data/cube.m.cube"))
        );
        assert!(RemoteCommand::parse("update").is_err());
        assert!(RemoteCommand::parse("reload x").is_err());
    }

    #[test]
    fn test_toggle_lock() {
        let state = ViewerState::new();
        assert!(!state.is_locked());
        assert!(state.toggle_lock());
        assert!(state.is_locked());
        assert!(!state.toggle_lock());
    }
}
