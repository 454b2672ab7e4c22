use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::pdu::{Request, Response};

/// MBAP header: transaction (2) + protocol (2) + length (2) + unit (1) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// Bytes preceding the span counted by the length field.
pub const LENGTH_PREFIX_SIZE: usize = 6;

/// Maximum size of a complete frame (header + PDU).
pub const MAX_ADU_SIZE: usize = 260;

/// Maximum PDU size (function code + data).
pub const MAX_PDU_SIZE: usize = MAX_ADU_SIZE - HEADER_SIZE;

/// The only protocol identifier Modbus TCP defines.
pub const PROTOCOL_ID: u16 = 0;

/// Per-message routing fields of the MBAP header.
///
/// The protocol id is always zero and the length is derived from the PDU,
/// so neither is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Echoed back unchanged so the client can match replies to requests.
    pub transaction_id: u16,
    /// Passed through unchanged by the gateway.
    pub unit_id: u8,
}

impl Header {
    /// Create a header.
    pub fn new(transaction_id: u16, unit_id: u8) -> Self {
        Self {
            transaction_id,
            unit_id,
        }
    }
}

/// A raw frame: header plus undecoded PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Routing header.
    pub header: Header,
    /// The PDU, function code first.
    pub pdu: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(header: Header, pdu: impl Into<Bytes>) -> Self {
        Self {
            header,
            pdu: pdu.into(),
        }
    }

    /// The function code (first PDU byte).
    pub fn function(&self) -> Option<u8> {
        self.pdu.first().copied()
    }

    /// The total wire size of this frame (header + PDU).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.pdu.len()
    }
}

/// A decoded request with the header needed to route its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub header: Header,
    pub request: Request,
}

/// A reply ready to be framed, or one decoded by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub header: Header,
    pub response: Response,
}

/// Encode a frame into the wire format.
///
/// Wire format (all fields big-endian):
/// ```text
/// ┌───────────────┬─────────────┬─────────────┬──────────┬────────────────┐
/// │ Transaction   │ Protocol    │ Length      │ Unit     │ PDU            │
/// │ (2B)          │ (2B) = 0    │ (2B)        │ (1B)     │ fn + data      │
/// │               │             │ = 1 + |PDU| │          │                │
/// └───────────────┴─────────────┴─────────────┴──────────┴────────────────┘
/// ```
pub fn encode_frame(header: Header, pdu: &[u8], dst: &mut BytesMut) -> Result<()> {
    if pdu.is_empty() {
        return Err(FrameError::EmptyPdu);
    }
    if pdu.len() > MAX_PDU_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: HEADER_SIZE + pdu.len(),
            max: MAX_ADU_SIZE,
        });
    }
    dst.reserve(HEADER_SIZE + pdu.len());
    dst.put_u16(header.transaction_id);
    dst.put_u16(PROTOCOL_ID);
    dst.put_u16(1 + pdu.len() as u16);
    dst.put_u8(header.unit_id);
    dst.put_slice(pdu);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly one frame; bytes of any following frame stay
/// in the buffer.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let transaction_id = u16::from_be_bytes([src[0], src[1]]);
    let protocol_id = u16::from_be_bytes([src[2], src[3]]);
    let length = u16::from_be_bytes([src[4], src[5]]);
    let unit_id = src[6];

    if protocol_id != PROTOCOL_ID {
        return Err(FrameError::InvalidProtocolId(protocol_id));
    }

    // unit id + function code at the very least
    if length < 2 {
        return Err(FrameError::LengthTooShort(length));
    }

    let total = LENGTH_PREFIX_SIZE + length as usize;
    if total > MAX_ADU_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: total,
            max: MAX_ADU_SIZE,
        });
    }

    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let pdu = src.split_to(total - HEADER_SIZE).freeze();
    trace!(transaction_id, unit_id, length, "decoded frame");

    Ok(Some(Frame {
        header: Header::new(transaction_id, unit_id),
        pdu,
    }))
}

/// Decode the next request frame from a buffer.
pub fn decode_request(src: &mut BytesMut) -> Result<Option<RequestFrame>> {
    let Some(frame) = decode_frame(src)? else {
        return Ok(None);
    };
    let request = Request::decode(&frame.pdu)?;
    Ok(Some(RequestFrame {
        header: frame.header,
        request,
    }))
}

/// Decode the next response frame from a buffer.
pub fn decode_response(src: &mut BytesMut) -> Result<Option<ResponseFrame>> {
    let Some(frame) = decode_frame(src)? else {
        return Ok(None);
    };
    let response = Response::decode(&frame.pdu)?;
    Ok(Some(ResponseFrame {
        header: frame.header,
        response,
    }))
}

/// Frame and append a request.
pub fn encode_request(frame: &RequestFrame, dst: &mut BytesMut) -> Result<()> {
    let mut pdu = BytesMut::new();
    frame.request.encode(&mut pdu);
    encode_frame(frame.header, &pdu, dst)
}

/// Frame and append a reply.
pub fn encode_response(frame: &ResponseFrame, dst: &mut BytesMut) -> Result<()> {
    let mut pdu = BytesMut::with_capacity(frame.response.encoded_len());
    frame.response.encode(&mut pdu);
    encode_frame(frame.header, &pdu, dst)
}
