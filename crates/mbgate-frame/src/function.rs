//! Function codes, protocol limits and exception codes.
//!
//! Only the three holding-register functions are served by the gateway.
//! Every other code still decodes, so it can be answered with an
//! `IllegalFunction` exception instead of dropping the connection.

/// Read Holding Registers.
pub const READ_HOLDING_REGISTERS: u8 = 0x03;

/// Write Single Register.
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Write Multiple Registers.
pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Bit set on the function code of an exception reply.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Largest register count a single read may request.
pub const MAX_READ_REGISTERS: u16 = 125;

/// Largest register count a single multi-register write may carry.
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// Returns a human-readable name for a function code.
pub fn function_name(code: u8) -> &'static str {
    match code {
        READ_HOLDING_REGISTERS => "READ_HOLDING_REGISTERS",
        WRITE_SINGLE_REGISTER => "WRITE_SINGLE_REGISTER",
        WRITE_MULTIPLE_REGISTERS => "WRITE_MULTIPLE_REGISTERS",
        c if c & EXCEPTION_FLAG != 0 => "EXCEPTION",
        _ => "UNSUPPORTED",
    }
}

/// Returns true if the gateway serves this function code.
pub fn is_supported(code: u8) -> bool {
    matches!(
        code,
        READ_HOLDING_REGISTERS | WRITE_SINGLE_REGISTER | WRITE_MULTIPLE_REGISTERS
    )
}

/// Protocol exception codes carried in exception replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionCode {
    /// The function code is not served.
    IllegalFunction,
    /// The addressed range falls outside the register store.
    IllegalDataAddress,
    /// A count or byte count is outside protocol limits.
    IllegalDataValue,
    /// The server failed while executing the request.
    ServerDeviceFailure,
    /// Any other code received from a foreign server.
    Other(u8),
}

impl ExceptionCode {
    /// Wire value of this exception.
    pub fn code(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
            Self::Other(code) => code,
        }
    }

    /// Parse a wire value.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalDataAddress,
            0x03 => Self::IllegalDataValue,
            0x04 => Self::ServerDeviceFailure,
            other => Self::Other(other),
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::IllegalFunction => "ILLEGAL_FUNCTION",
            Self::IllegalDataAddress => "ILLEGAL_DATA_ADDRESS",
            Self::IllegalDataValue => "ILLEGAL_DATA_VALUE",
            Self::ServerDeviceFailure => "SERVER_DEVICE_FAILURE",
            Self::Other(_) => "UNKNOWN_EXCEPTION",
        }
    }
}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), self.code())
    }
}
