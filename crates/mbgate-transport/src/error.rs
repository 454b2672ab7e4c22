use std::net::SocketAddr;

/// Errors that can occur in gateway transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create or bind the listening socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The socket was bound but could not be put into listening state.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The readiness notification could not be delivered.
    #[error("failed to notify {path}: {source}")]
    Notify {
        path: String,
        source: std::io::Error,
    },

    /// The notification socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: String,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// Returns true for errors that prevent the gateway from ever serving.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::Listen { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
