//! Request dispatch: maps one decoded request onto the register store.
//!
//! Validation runs in a fixed order and stops at the first failure:
//!
//! 1. unsupported function code: `ILLEGAL_FUNCTION`
//! 2. register count or byte count out of range: `ILLEGAL_DATA_VALUE`
//! 3. addresses beyond the store: `ILLEGAL_DATA_ADDRESS`
//!
//! A request that fails validation never touches the store.

use mbgate_frame::{ExceptionCode, Request, Response, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};
use tracing::warn;

use crate::store::RegisterStore;

/// Execute `request` against `store` and build the reply.
///
/// Never fails: every outcome is either a success reply or an exception
/// reply for the request's function code.
pub fn dispatch(store: &mut RegisterStore, request: &Request) -> Response {
    let function = request.function();

    match request {
        Request::ReadHoldingRegisters { start, count } => {
            if !(1..=MAX_READ_REGISTERS).contains(count) {
                return Response::exception(function, ExceptionCode::IllegalDataValue);
            }
            match store.read(*start, *count) {
                Ok(values) => Response::ReadHoldingRegisters {
                    values: values.to_vec(),
                },
                Err(_) => Response::exception(function, ExceptionCode::IllegalDataAddress),
            }
        }

        Request::WriteSingleRegister { address, value } => {
            match store.write_one(*address, *value) {
                Ok(()) => Response::WriteSingleRegister {
                    address: *address,
                    value: *value,
                },
                Err(_) => Response::exception(function, ExceptionCode::IllegalDataAddress),
            }
        }

        Request::WriteMultipleRegisters {
            start,
            count,
            byte_count,
            values,
        } => {
            if !(1..=MAX_WRITE_REGISTERS).contains(count)
                || *byte_count as usize != *count as usize * 2
                || values.len() != *count as usize
            {
                return Response::exception(function, ExceptionCode::IllegalDataValue);
            }
            match store.write_many(*start, values) {
                Ok(()) => Response::WriteMultipleRegisters {
                    start: *start,
                    count: *count,
                },
                Err(_) => Response::exception(function, ExceptionCode::IllegalDataAddress),
            }
        }

        Request::Unsupported { function } => {
            warn!(function = *function, "unsupported function code {function:#04x}");
            Response::exception(*function, ExceptionCode::IllegalFunction)
        }
    }
}
