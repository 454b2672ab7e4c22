//! Per-connection request/reply driver.

use std::fmt;
use std::net::SocketAddr;
use std::rc::Rc;

use futures_util::{SinkExt, StreamExt};
use mbgate_frame::{FrameError, RequestFrame, ResponseFrame, ServerCodec};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::gateway::Shared;

/// Identifier assigned to each accepted connection, in accept order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a connection is in its request/reply cycle.
///
/// A connection moves `Reading -> Processing -> Writing -> Reading` for each
/// request, and into `Closed` from any state. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for a complete request frame.
    Reading,
    /// Dispatching a request against the store.
    Processing,
    /// Sending the reply.
    Writing,
    /// Resources released.
    Closed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reading => "reading",
            Self::Processing => "processing",
            Self::Writing => "writing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a connection ended.
#[derive(Debug)]
pub enum CloseReason {
    /// The client closed the connection between frames.
    PeerClosed,
    /// The client sent a frame that could not be decoded.
    Malformed(FrameError),
    /// Reading or writing failed, or the stream ended mid-frame.
    Io(FrameError),
    /// The gateway is shutting down.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("peer closed"),
            Self::Malformed(err) => write!(f, "malformed frame: {err}"),
            Self::Io(err) => write!(f, "i/o: {err}"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

impl From<FrameError> for CloseReason {
    fn from(err: FrameError) -> Self {
        if err.is_malformed() {
            Self::Malformed(err)
        } else {
            Self::Io(err)
        }
    }
}

/// One client connection owned by the reactor.
pub(crate) struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    framed: Framed<TcpStream, ServerCodec>,
    state: ConnectionState,
    shared: Rc<Shared>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        peer: SocketAddr,
        stream: TcpStream,
        shared: Rc<Shared>,
    ) -> Self {
        Self {
            id,
            peer,
            framed: Framed::new(stream, ServerCodec),
            state: ConnectionState::Reading,
            shared,
        }
    }

    /// Serve requests until the client leaves, misbehaves, or `shutdown` fires.
    ///
    /// Replies go out in request order; at most one request is in flight.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) -> CloseReason {
        let reason = self.serve(&shutdown).await;
        self.transition(ConnectionState::Closed);
        reason
    }

    async fn serve(&mut self, shutdown: &CancellationToken) -> CloseReason {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return CloseReason::Shutdown,
                next = self.framed.next() => next,
            };

            let request = match next {
                None => return CloseReason::PeerClosed,
                Some(Err(err)) => {
                    if err.is_malformed() {
                        self.shared.record_malformed();
                    }
                    return err.into();
                }
                Some(Ok(request)) => request,
            };

            self.transition(ConnectionState::Processing);
            let reply = self.process(request);

            self.transition(ConnectionState::Writing);
            let sent = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return CloseReason::Shutdown,
                sent = self.framed.send(reply) => sent,
            };
            if let Err(err) = sent {
                return err.into();
            }

            self.transition(ConnectionState::Reading);
        }
    }

    fn process(&self, frame: RequestFrame) -> ResponseFrame {
        let response = self.shared.dispatch(&frame.request);
        trace!(
            connection = %self.id,
            transaction_id = frame.header.transaction_id,
            function = frame.request.function(),
            exception = response.is_exception(),
            "request processed"
        );
        ResponseFrame {
            header: frame.header,
            response,
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!(
            connection = %self.id,
            peer = %self.peer,
            from = %self.state,
            to = %next,
            "connection state"
        );
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_display() {
        assert_eq!(ConnectionId(7).to_string(), "conn-7");
    }

    #[test]
    fn state_names() {
        assert_eq!(ConnectionState::Reading.to_string(), "reading");
        assert_eq!(ConnectionState::Processing.as_str(), "processing");
        assert_eq!(ConnectionState::Writing.as_str(), "writing");
        assert_eq!(ConnectionState::Closed.as_str(), "closed");
    }

    #[test]
    fn close_reason_classifies_frame_errors() {
        let reason = CloseReason::from(FrameError::InvalidProtocolId(1));
        assert!(matches!(reason, CloseReason::Malformed(_)));

        let reason = CloseReason::from(FrameError::ConnectionClosed);
        assert!(matches!(reason, CloseReason::Io(_)));
        assert!(reason.to_string().starts_with("i/o: "));
    }
}
