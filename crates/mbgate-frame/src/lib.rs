//! Modbus TCP framing and PDU codec.
//!
//! Every message on the wire is framed with a 7-byte MBAP header:
//! - a 2-byte transaction id, echoed back in the reply
//! - a 2-byte protocol id, always zero
//! - a 2-byte length counting the unit id and the PDU
//! - a 1-byte unit id, passed through unchanged
//!
//! followed by a PDU whose first byte is the function code. All multi-byte
//! fields are big-endian.
//!
//! Decoding never trusts a header it cannot parse: malformed frames surface
//! as [`FrameError`]s for which [`FrameError::is_malformed`] is true.

pub mod codec;
pub mod error;
pub mod function;
pub mod pdu;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    decode_frame, decode_request, decode_response, encode_frame, encode_request, encode_response,
    Frame, Header, RequestFrame, ResponseFrame, HEADER_SIZE, MAX_ADU_SIZE, MAX_PDU_SIZE,
    PROTOCOL_ID,
};
pub use error::{FrameError, Result};
pub use function::{
    function_name, is_supported, ExceptionCode, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS,
    READ_HOLDING_REGISTERS, WRITE_MULTIPLE_REGISTERS, WRITE_SINGLE_REGISTER,
};
pub use pdu::{Request, Response};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::{ClientCodec, ServerCodec};
