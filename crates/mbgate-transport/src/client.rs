use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// Connect to a gateway as a blocking client.
///
/// `target` is anything `ToSocketAddrs` accepts as a string (`host:port`).
/// Every resolved address is tried in order; the same `timeout` bounds the
/// connect attempt and subsequent reads and writes.
pub fn connect(target: &str, timeout: Duration) -> Result<TcpStream> {
    let addrs = target
        .to_socket_addrs()
        .map_err(|source| TransportError::Connect {
            target: target.to_string(),
            source,
        })?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                stream.set_nodelay(true)?;
                debug!(%addr, "connected to gateway");
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }

    Err(TransportError::Connect {
        target: target.to_string(),
        source: last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "address resolved to nothing",
            )
        }),
    })
}
