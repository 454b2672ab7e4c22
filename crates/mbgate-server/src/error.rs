use mbgate_frame::ExceptionCode;

/// Errors that can occur in gateway and client operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] mbgate_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] mbgate_frame::FrameError),

    /// Register store could not be created.
    #[error("register store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// The server answered with an exception reply.
    #[error("server returned exception {code} for function {function:#04x}")]
    Exception { function: u8, code: ExceptionCode },

    /// The reply does not belong to the request that was sent.
    #[error("transaction id mismatch: sent {expected}, received {actual}")]
    TransactionMismatch { expected: u16, actual: u16 },

    /// The reply carried a different function than the request.
    #[error("unexpected reply to function {expected:#04x}: got {actual:#04x}")]
    UnexpectedResponse { expected: u8, actual: u8 },

    /// The async runtime could not be started.
    #[error("runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

impl GatewayError {
    /// Whether this error means the server never started serving.
    pub fn is_startup_fatal(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_startup_fatal(),
            Self::Store(_) | Self::Runtime(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
