//! TCP transport for the Modbus gateway.
//!
//! Provides the pieces that touch the operating system directly:
//! - the listening socket (fixed backlog, `TCP_NODELAY` on accepted streams)
//! - a blocking client connection used by the command-line tools
//! - the service-supervisor readiness datagram
//!
//! This is the lowest layer of mbgate. The frame codec and the gateway
//! reactor build on the types provided here.

pub mod client;
pub mod error;
pub mod listener;
pub mod notify;

pub use client::connect;
pub use error::{Result, TransportError};
pub use listener::{GatewayListener, DEFAULT_BACKLOG, DEFAULT_PORT};
pub use notify::{ReadyNotifier, DEFAULT_NOTIFY_SOCKET, NOTIFY_SOCKET_ENV, READY_STATE};
