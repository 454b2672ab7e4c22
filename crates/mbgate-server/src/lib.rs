//! Modbus TCP gateway server.
//!
//! A [`Gateway`] owns one [`RegisterStore`] and serves it to any number of
//! TCP clients from a single-threaded reactor. Each request is decoded,
//! validated and applied by [`dispatch`], and answered on the connection it
//! arrived on, in arrival order.
//!
//! [`GatewayClient`] is a small blocking client for the same protocol.

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod store;

pub use client::{GatewayClient, DEFAULT_UNIT_ID};
pub use connection::{CloseReason, ConnectionId, ConnectionState};
pub use dispatch::dispatch;
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayConfig, GatewayStats};
pub use store::{RegisterStore, StoreError, MAX_REGISTERS};
