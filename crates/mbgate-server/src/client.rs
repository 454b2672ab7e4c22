use std::net::TcpStream;
use std::time::Duration;

use mbgate_frame::{FrameReader, FrameWriter, Header, Request, RequestFrame, Response};
use tracing::debug;

use crate::error::{GatewayError, Result};

/// Unit id used when the caller does not pick one.
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Blocking Modbus TCP client, one request in flight at a time.
pub struct GatewayClient {
    reader: FrameReader<TcpStream>,
    writer: FrameWriter<TcpStream>,
    unit_id: u8,
    next_transaction: u16,
}

impl GatewayClient {
    /// Connect to `target` (`host:port`), applying `timeout` to the connect
    /// and to every read and write.
    pub fn connect(target: &str, timeout: Duration) -> Result<Self> {
        let stream = mbgate_transport::connect(target, timeout)?;
        Self::from_stream(stream)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let reader_stream = stream.try_clone().map_err(mbgate_frame::FrameError::Io)?;
        Ok(Self {
            reader: FrameReader::new(reader_stream),
            writer: FrameWriter::new(stream),
            unit_id: DEFAULT_UNIT_ID,
            next_transaction: 1,
        })
    }

    /// Address requests to a different unit id.
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Send `request` and wait for its reply.
    ///
    /// Exception replies are returned as [`Response::Exception`], not errors.
    pub fn transact(&mut self, request: Request) -> Result<Response> {
        let transaction_id = self.next_transaction;
        self.next_transaction = self.next_transaction.wrapping_add(1);
        let function = request.function();

        self.writer.write_request(&RequestFrame {
            header: Header::new(transaction_id, self.unit_id),
            request,
        })?;

        let reply = self.reader.read_response()?;
        debug!(
            transaction_id,
            function,
            exception = reply.response.is_exception(),
            "reply received"
        );

        if reply.header.transaction_id != transaction_id {
            return Err(GatewayError::TransactionMismatch {
                expected: transaction_id,
                actual: reply.header.transaction_id,
            });
        }

        let echoed = match &reply.response {
            Response::Exception { function, .. } => *function,
            other => other.function(),
        };
        if echoed != function {
            return Err(GatewayError::UnexpectedResponse {
                expected: function,
                actual: reply.response.function(),
            });
        }

        Ok(reply.response)
    }

    /// Read `count` holding registers beginning at `start`.
    pub fn read_holding_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>> {
        match self.transact(Request::ReadHoldingRegisters { start, count })? {
            Response::ReadHoldingRegisters { values } => Ok(values),
            other => Err(unexpected(mbgate_frame::READ_HOLDING_REGISTERS, other)),
        }
    }

    /// Write one register.
    pub fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        match self.transact(Request::WriteSingleRegister { address, value })? {
            Response::WriteSingleRegister { .. } => Ok(()),
            other => Err(unexpected(mbgate_frame::WRITE_SINGLE_REGISTER, other)),
        }
    }

    /// Write consecutive registers beginning at `start`.
    pub fn write_multiple_registers(&mut self, start: u16, values: &[u16]) -> Result<()> {
        match self.transact(Request::write_multiple(start, values))? {
            Response::WriteMultipleRegisters { .. } => Ok(()),
            other => Err(unexpected(mbgate_frame::WRITE_MULTIPLE_REGISTERS, other)),
        }
    }

    /// Remote address of the connection.
    pub fn peer_addr(&self) -> Result<std::net::SocketAddr> {
        self.writer
            .get_ref()
            .peer_addr()
            .map_err(|err| mbgate_frame::FrameError::Io(err).into())
    }
}

fn unexpected(expected: u8, response: Response) -> GatewayError {
    match response {
        Response::Exception { function, code } => GatewayError::Exception { function, code },
        other => GatewayError::UnexpectedResponse {
            expected,
            actual: other.function(),
        },
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("unit_id", &self.unit_id)
            .field("next_transaction", &self.next_transaction)
            .finish()
    }
}
