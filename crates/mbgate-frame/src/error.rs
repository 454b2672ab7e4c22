/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The MBAP header carries a protocol identifier other than zero.
    #[error("invalid protocol identifier {0:#06x} (expected 0)")]
    InvalidProtocolId(u16),

    /// The length field cannot cover a unit identifier and a function code.
    #[error("length field {0} too short (minimum 2)")]
    LengthTooShort(u16),

    /// The declared frame exceeds the protocol's maximum ADU size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The PDU length does not match the shape its function code requires.
    #[error("function {function:#04x}: expected {expected} PDU bytes, got {actual}")]
    LengthMismatch {
        function: u8,
        expected: usize,
        actual: usize,
    },

    /// A PDU with no function code.
    #[error("empty PDU")]
    EmptyPdu,

    /// A response carried a function code the client cannot interpret.
    #[error("unexpected function code {0:#04x} in response")]
    UnexpectedFunction(u8),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the bytes on the wire could not be parsed as a frame.
    ///
    /// A malformed frame has no trustworthy header, so no reply can be framed
    /// for it; the connection is closed instead.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
