use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};

/// Well-known Modbus TCP port. Binding it needs elevated privileges on most hosts.
pub const DEFAULT_PORT: u16 = 502;

/// Pending-connection queue depth handed to `listen(2)`.
pub const DEFAULT_BACKLOG: u32 = 10;

/// Listening TCP socket for gateway clients.
///
/// Must be created from within a tokio runtime: the socket is registered
/// with the runtime's reactor when it enters the listening state.
pub struct GatewayListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    nodelay: bool,
}

impl GatewayListener {
    /// Bind and listen with the default backlog.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_backlog(addr, DEFAULT_BACKLOG)
    }

    /// Bind and listen with an explicit backlog depth.
    pub fn bind_with_backlog(addr: SocketAddr, backlog: u32) -> Result<Self> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(|source| TransportError::Bind { addr, source })?;

        #[cfg(unix)]
        socket
            .set_reuseaddr(true)
            .map_err(|source| TransportError::Bind { addr, source })?;

        socket
            .bind(addr)
            .map_err(|source| TransportError::Bind { addr, source })?;

        let listener = socket
            .listen(backlog)
            .map_err(|source| TransportError::Listen { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Listen { addr, source })?;

        info!(%local_addr, backlog, "listening for modbus tcp clients");

        Ok(Self {
            listener,
            local_addr,
            nodelay: true,
        })
    }

    /// Enable or disable `TCP_NODELAY` on accepted streams (enabled by default).
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Accept the next pending connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        if self.nodelay {
            if let Err(err) = stream.set_nodelay(true) {
                warn!(%peer, error = %err, "failed to set TCP_NODELAY");
            }
        }

        debug!(%peer, "accepted connection");
        Ok((stream, peer))
    }

    /// The address actually bound (resolves port 0 to the assigned port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl std::fmt::Debug for GatewayListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayListener")
            .field("local_addr", &self.local_addr)
            .field("nodelay", &self.nodelay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::client::connect;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_bind_accept_connect() {
        let listener = GatewayListener::bind(loopback()).unwrap();
        let addr = listener.local_addr();
        assert_ne!(addr.port(), 0);

        let client = tokio::task::spawn_blocking(move || {
            let mut client = connect(&addr.to_string(), Duration::from_secs(2)).unwrap();
            client.write_all(b"hello").unwrap();
            let mut buf = [0u8; 5];
            client.read_exact(&mut buf).unwrap();
            buf
        });

        let (mut server, peer) = listener.accept().await.unwrap();
        assert!(peer.ip().is_loopback());
        assert!(server.nodelay().unwrap());

        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        server.write_all(b"world").await.unwrap();

        assert_eq!(&client.await.unwrap(), b"world");
    }

    #[tokio::test]
    async fn test_nodelay_can_be_disabled() {
        let listener = GatewayListener::bind(loopback())
            .unwrap()
            .with_nodelay(false);
        let addr = listener.local_addr();

        let client = tokio::task::spawn_blocking(move || {
            connect(&addr.to_string(), Duration::from_secs(2)).unwrap()
        });

        let (server, _) = listener.accept().await.unwrap();
        assert!(!server.nodelay().unwrap());
        drop(client.await.unwrap());
    }

    #[tokio::test]
    async fn test_bind_in_use_port_fails() {
        let first = GatewayListener::bind(loopback()).unwrap();
        let result = GatewayListener::bind(first.local_addr());

        let err = result.unwrap_err();
        // Linux may accept the second bind under SO_REUSEADDR and refuse the listen.
        assert!(matches!(
            err,
            TransportError::Bind { .. } | TransportError::Listen { .. }
        ));
        assert!(err.is_startup_fatal());
    }

    #[tokio::test]
    async fn test_bind_with_custom_backlog() {
        let listener = GatewayListener::bind_with_backlog(loopback(), 1).unwrap();
        assert_ne!(listener.local_addr().port(), 0);
        assert!(format!("{listener:?}").contains("GatewayListener"));
    }
}
