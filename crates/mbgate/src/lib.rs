//! Modbus TCP gateway.
//!
//! mbgate exposes one bank of 16-bit holding registers to any number of TCP
//! clients speaking Modbus TCP (read holding registers, write single
//! register, write multiple registers).
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP listener, client connect, supervisor readiness notification
//! - [`frame`]: MBAP framing and request/response PDU codec
//! - [`server`]: register store, dispatcher and the gateway reactor (behind `server` feature)

/// Re-export transport types.
pub mod transport {
    pub use mbgate_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mbgate_frame::*;
}

/// Re-export server types (requires `server` feature).
#[cfg(feature = "server")]
pub mod server {
    pub use mbgate_server::*;
}
