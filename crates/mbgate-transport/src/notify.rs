use tracing::debug;

use crate::error::{Result, TransportError};

/// State string sent once the listening socket is ready.
pub const READY_STATE: &str = "STATUS=Modbus TCP gateway server is ready\nREADY=1\n";

/// Fallback notification socket when `$NOTIFY_SOCKET` is not set.
pub const DEFAULT_NOTIFY_SOCKET: &str = "/run/systemd/notify";

/// Environment variable a service supervisor uses to pass its socket path.
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// `sockaddr_un.sun_path` capacity on Linux.
#[cfg(unix)]
const MAX_PATH_LEN: usize = 108;

/// Sends readiness datagrams to a service supervisor.
///
/// A path starting with `@` names a Linux abstract-namespace socket.
#[derive(Debug, Clone)]
pub struct ReadyNotifier {
    path: String,
}

impl ReadyNotifier {
    /// Notify an explicit socket path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the socket from `$NOTIFY_SOCKET`, falling back to the default path.
    pub fn from_env() -> Self {
        match std::env::var(NOTIFY_SOCKET_ENV) {
            Ok(path) if !path.is_empty() => Self::new(path),
            _ => Self::new(DEFAULT_NOTIFY_SOCKET),
        }
    }

    /// The socket this notifier targets.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Announce that the service is ready.
    pub fn notify_ready(&self) -> Result<()> {
        self.send(READY_STATE)
    }

    /// Send a raw state string as a single datagram.
    #[cfg(unix)]
    pub fn send(&self, state: &str) -> Result<()> {
        use std::os::unix::net::UnixDatagram;

        if self.path.len() >= MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path: self.path.clone(),
                len: self.path.len(),
                max: MAX_PATH_LEN,
            });
        }

        let socket = UnixDatagram::unbound().map_err(|e| self.notify_error(e))?;

        let sent = match self.path.strip_prefix('@') {
            Some(name) => send_abstract(&socket, name, state.as_bytes()),
            None => socket.send_to(state.as_bytes(), std::path::Path::new(&self.path)),
        }
        .map_err(|e| self.notify_error(e))?;

        if sent != state.len() {
            return Err(self.notify_error(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "short datagram write",
            )));
        }

        debug!(path = %self.path, "sent readiness notification");
        Ok(())
    }

    /// Readiness notification is a Unix-only facility.
    #[cfg(not(unix))]
    pub fn send(&self, _state: &str) -> Result<()> {
        Err(self.notify_error(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "readiness notification requires unix datagram sockets",
        )))
    }

    fn notify_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Notify {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(target_os = "linux")]
fn send_abstract(
    socket: &std::os::unix::net::UnixDatagram,
    name: &str,
    data: &[u8],
) -> std::io::Result<usize> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    socket.send_to_addr(data, &addr)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn send_abstract(
    _socket: &std::os::unix::net::UnixDatagram,
    _name: &str,
    _data: &[u8],
) -> std::io::Result<usize> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "abstract socket namespace is Linux-only",
    ))
}
