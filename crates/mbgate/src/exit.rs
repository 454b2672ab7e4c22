use std::fmt;
use std::io;

use mbgate_frame::FrameError;
use mbgate_server::GatewayError;
use mbgate_transport::TransportError;

// Process exit codes. Scripts and supervisors match on these values.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_exit_code(&err), format!("{context}: {err}"))
}

fn io_exit_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Bind { source, .. }
        | TransportError::Listen { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_exit_code(source),
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn gateway_error(context: &str, err: GatewayError) -> CliError {
    match err {
        GatewayError::Transport(err) => transport_error(context, err),
        GatewayError::Frame(err) => frame_error(context, err),
        GatewayError::Store(err) => CliError::new(USAGE, format!("{context}: {err}")),
        GatewayError::Runtime(source) => io_error(context, source),
        other @ (GatewayError::Exception { .. }
        | GatewayError::TransactionMismatch { .. }
        | GatewayError::UnexpectedResponse { .. }) => {
            CliError::new(DATA_INVALID, format!("{context}: {other}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use mbgate_frame::ExceptionCode;
    use mbgate_server::StoreError;

    use super::*;

    #[test]
    fn exception_reply_is_data_invalid() {
        let err = gateway_error(
            "read failed",
            GatewayError::Exception {
                function: 0x03,
                code: ExceptionCode::IllegalDataAddress,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("ILLEGAL_DATA_ADDRESS"));
    }

    #[test]
    fn invalid_store_size_is_usage() {
        let err = gateway_error(
            "startup failed",
            GatewayError::Store(StoreError::InvalidSize {
                size: 0,
                max: 65_536,
            }),
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn refused_connection_is_failure() {
        let err = transport_error(
            "connect failed",
            TransportError::Connect {
                target: "127.0.0.1:1".to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert_eq!(
            transport_error(
                "bind failed",
                TransportError::Bind {
                    addr: "0.0.0.0:502".parse().unwrap(),
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                }
            )
            .code,
            PERMISSION_DENIED
        );
    }

    #[test]
    fn startup_errors_keep_address_context() {
        let err = transport_error(
            "gateway failed",
            TransportError::Listen {
                addr: "127.0.0.1:1502".parse().unwrap(),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert!(err
            .message
            .starts_with("gateway failed: failed to listen on 127.0.0.1:1502: "));

        let err = transport_error(
            "gateway failed",
            TransportError::Bind {
                addr: "127.0.0.1:1502".parse().unwrap(),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            },
        );
        assert!(err.message.contains("failed to bind to 127.0.0.1:1502"));
    }

    #[test]
    fn malformed_reply_is_data_invalid() {
        let err = frame_error("read failed", FrameError::InvalidProtocolId(7));
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(
            frame_error("read failed", FrameError::ConnectionClosed).code,
            FAILURE
        );
    }
}
