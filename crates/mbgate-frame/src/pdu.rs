use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::function::{
    ExceptionCode, EXCEPTION_FLAG, READ_HOLDING_REGISTERS, WRITE_MULTIPLE_REGISTERS,
    WRITE_SINGLE_REGISTER,
};

/// A decoded request PDU.
///
/// Decoding checks only that the PDU is shaped the way its function code
/// demands. Protocol limits (counts, byte counts, address ranges) are the
/// dispatcher's job, so they can be answered with exception replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `0x03`: read `count` registers beginning at `start`.
    ReadHoldingRegisters { start: u16, count: u16 },
    /// `0x06`: store `value` at `address`.
    WriteSingleRegister { address: u16, value: u16 },
    /// `0x10`: store `values` beginning at `start`.
    ///
    /// `count` and `byte_count` are kept exactly as received.
    WriteMultipleRegisters {
        start: u16,
        count: u16,
        byte_count: u8,
        values: Vec<u16>,
    },
    /// Any function code the gateway does not serve.
    Unsupported { function: u8 },
}

impl Request {
    /// Build a consistent multi-register write.
    pub fn write_multiple(start: u16, values: &[u16]) -> Self {
        Self::WriteMultipleRegisters {
            start,
            count: values.len() as u16,
            byte_count: (values.len() * 2) as u8,
            values: values.to_vec(),
        }
    }

    /// The function code of this request.
    pub fn function(&self) -> u8 {
        match self {
            Self::ReadHoldingRegisters { .. } => READ_HOLDING_REGISTERS,
            Self::WriteSingleRegister { .. } => WRITE_SINGLE_REGISTER,
            Self::WriteMultipleRegisters { .. } => WRITE_MULTIPLE_REGISTERS,
            Self::Unsupported { function } => *function,
        }
    }

    /// Decode a request PDU (function code first).
    pub fn decode(pdu: &[u8]) -> Result<Self> {
        let (&function, body) = pdu.split_first().ok_or(FrameError::EmptyPdu)?;

        match function {
            READ_HOLDING_REGISTERS => {
                let (start, count) = two_words(function, pdu)?;
                Ok(Self::ReadHoldingRegisters { start, count })
            }
            WRITE_SINGLE_REGISTER => {
                let (address, value) = two_words(function, pdu)?;
                Ok(Self::WriteSingleRegister { address, value })
            }
            WRITE_MULTIPLE_REGISTERS => {
                if pdu.len() < 6 {
                    return Err(FrameError::LengthMismatch {
                        function,
                        expected: 6,
                        actual: pdu.len(),
                    });
                }
                let start = word(&body[0..2]);
                let count = word(&body[2..4]);
                let byte_count = body[4];
                let expected = 6 + byte_count as usize;
                if pdu.len() != expected {
                    return Err(FrameError::LengthMismatch {
                        function,
                        expected,
                        actual: pdu.len(),
                    });
                }
                let values = body[5..].chunks_exact(2).map(word).collect();
                Ok(Self::WriteMultipleRegisters {
                    start,
                    count,
                    byte_count,
                    values,
                })
            }
            other => Ok(Self::Unsupported { function: other }),
        }
    }

    /// Append the encoded PDU to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.function());
        match self {
            Self::ReadHoldingRegisters { start, count } => {
                dst.put_u16(*start);
                dst.put_u16(*count);
            }
            Self::WriteSingleRegister { address, value } => {
                dst.put_u16(*address);
                dst.put_u16(*value);
            }
            Self::WriteMultipleRegisters {
                start,
                count,
                byte_count,
                values,
            } => {
                dst.put_u16(*start);
                dst.put_u16(*count);
                dst.put_u8(*byte_count);
                for value in values {
                    dst.put_u16(*value);
                }
            }
            Self::Unsupported { .. } => {}
        }
    }
}

/// A reply PDU: a normal response or an exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `0x03` reply: the requested register values.
    ReadHoldingRegisters { values: Vec<u16> },
    /// `0x06` reply: echo of the written address and value.
    WriteSingleRegister { address: u16, value: u16 },
    /// `0x10` reply: echo of the start address and register count.
    WriteMultipleRegisters { start: u16, count: u16 },
    /// Exception reply for the request's (unflagged) `function`.
    Exception { function: u8, code: ExceptionCode },
}

impl Response {
    /// Exception reply for `function`.
    pub fn exception(function: u8, code: ExceptionCode) -> Self {
        Self::Exception { function, code }
    }

    /// The function code as it appears on the wire.
    pub fn function(&self) -> u8 {
        match self {
            Self::ReadHoldingRegisters { .. } => READ_HOLDING_REGISTERS,
            Self::WriteSingleRegister { .. } => WRITE_SINGLE_REGISTER,
            Self::WriteMultipleRegisters { .. } => WRITE_MULTIPLE_REGISTERS,
            Self::Exception { function, .. } => function | EXCEPTION_FLAG,
        }
    }

    /// True for exception replies.
    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }

    /// Append the encoded PDU to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.function());
        match self {
            Self::ReadHoldingRegisters { values } => {
                dst.put_u8((values.len() * 2) as u8);
                for value in values {
                    dst.put_u16(*value);
                }
            }
            Self::WriteSingleRegister { address, value } => {
                dst.put_u16(*address);
                dst.put_u16(*value);
            }
            Self::WriteMultipleRegisters { start, count } => {
                dst.put_u16(*start);
                dst.put_u16(*count);
            }
            Self::Exception { code, .. } => dst.put_u8(code.code()),
        }
    }

    /// Encoded PDU length in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::ReadHoldingRegisters { values } => 2 + values.len() * 2,
            Self::WriteSingleRegister { .. } | Self::WriteMultipleRegisters { .. } => 5,
            Self::Exception { .. } => 2,
        }
    }

    /// Decode a reply PDU (client side).
    pub fn decode(pdu: &[u8]) -> Result<Self> {
        let (&function, body) = pdu.split_first().ok_or(FrameError::EmptyPdu)?;

        if function & EXCEPTION_FLAG != 0 {
            if pdu.len() != 2 {
                return Err(FrameError::LengthMismatch {
                    function,
                    expected: 2,
                    actual: pdu.len(),
                });
            }
            return Ok(Self::Exception {
                function: function & !EXCEPTION_FLAG,
                code: ExceptionCode::from_code(body[0]),
            });
        }

        match function {
            READ_HOLDING_REGISTERS => {
                let byte_count = *body.first().ok_or(FrameError::LengthMismatch {
                    function,
                    expected: 2,
                    actual: pdu.len(),
                })? as usize;
                let expected = 2 + byte_count;
                if pdu.len() != expected || byte_count % 2 != 0 {
                    return Err(FrameError::LengthMismatch {
                        function,
                        expected,
                        actual: pdu.len(),
                    });
                }
                let values = body[1..].chunks_exact(2).map(word).collect();
                Ok(Self::ReadHoldingRegisters { values })
            }
            WRITE_SINGLE_REGISTER => {
                let (address, value) = two_words(function, pdu)?;
                Ok(Self::WriteSingleRegister { address, value })
            }
            WRITE_MULTIPLE_REGISTERS => {
                let (start, count) = two_words(function, pdu)?;
                Ok(Self::WriteMultipleRegisters { start, count })
            }
            other => Err(FrameError::UnexpectedFunction(other)),
        }
    }
}

fn word(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Parse the fixed `function + u16 + u16` shape.
fn two_words(function: u8, pdu: &[u8]) -> Result<(u16, u16)> {
    if pdu.len() != 5 {
        return Err(FrameError::LengthMismatch {
            function,
            expected: 5,
            actual: pdu.len(),
        });
    }
    Ok((word(&pdu[1..3]), word(&pdu[3..5])))
}
