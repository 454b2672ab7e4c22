use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_frame, Frame, ResponseFrame, MAX_ADU_SIZE};
use crate::error::{FrameError, Result};
use crate::pdu::Response;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally, so callers always get complete frames.
/// Bytes belonging to a following frame stay buffered for the next call.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_ADU_SIZE),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; MAX_ADU_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next frame and decode it as a reply.
    pub fn read_response(&mut self) -> Result<ResponseFrame> {
        let frame = self.read_frame()?;
        let response = Response::decode(&frame.pdu)?;
        Ok(ResponseFrame {
            header: frame.header,
            response,
        })
    }

    /// Number of bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_frame, encode_response, Header};
    use crate::function::ExceptionCode;

    fn wire_frame(transaction_id: u16, pdu: &[u8]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_frame(Header::new(transaction_id, 1), pdu, &mut wire).unwrap();
        wire.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let wire = wire_frame(1, &[0x06, 0x00, 0x03, 0x00, 0x2A]);

        let mut reader = FrameReader::new(Cursor::new(wire));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.header.transaction_id, 1);
        assert_eq!(frame.pdu.as_ref(), &[0x06, 0x00, 0x03, 0x00, 0x2A]);
    }

    #[test]
    fn read_multiple_frames() {
        let mut wire = wire_frame(1, &[0x06, 0, 0, 0, 1]);
        wire.extend(wire_frame(2, &[0x06, 0, 1, 0, 2]));
        wire.extend(wire_frame(3, &[0x86, 0x02]));

        let mut reader = FrameReader::new(Cursor::new(wire));

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!(f1.header.transaction_id, 1);
        assert_eq!(f2.header.transaction_id, 2);
        assert_eq!((f3.header.transaction_id, f3.pdu.as_ref()), (3, &[0x86, 0x02][..]));
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn read_response_decodes_exception() {
        let mut wire = BytesMut::new();
        encode_response(
            &ResponseFrame {
                header: Header::new(9, 4),
                response: Response::exception(0x03, ExceptionCode::IllegalDataAddress),
            },
            &mut wire,
        )
        .unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let reply = reader.read_response().unwrap();

        assert_eq!(reply.header, Header::new(9, 4));
        assert_eq!(
            reply.response,
            Response::Exception {
                function: 0x03,
                code: ExceptionCode::IllegalDataAddress
            }
        );
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire_frame(4, &[0x03, 0x04, 0x00, 0x01, 0x00, 0x02]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.header.transaction_id, 4);
        assert_eq!(frame.pdu.len(), 6);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_u16(1);
        partial.put_u16(0);
        partial.put_u16(6);
        partial.put_u8(1);
        partial.put_slice(&[0x03, 0x00]);

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn invalid_protocol_id_in_stream() {
        let bytes = vec![0x00, 0x01, 0x12, 0x34, 0x00, 0x06, 0x01];
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::InvalidProtocolId(0x1234)));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        let frame = Frame::new(Header::new(77, 2), vec![0x03, 0x02, 0x00, 0x2A]);
        writer.write_frame(&frame).unwrap();

        assert_eq!(reader.read_frame().unwrap(), frame);
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire_frame(7, &[0x06, 0, 0, 0, 0]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire_frame(8, &[0x06, 0, 0, 0, 0]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame.header.transaction_id, 8);
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            copy_remaining(&self.bytes, &mut self.pos, buf)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            copy_remaining(&self.bytes, &mut self.pos, buf)
        }
    }

    fn copy_remaining(bytes: &[u8], pos: &mut usize, buf: &mut [u8]) -> std::io::Result<usize> {
        if *pos >= bytes.len() {
            return Ok(0);
        }
        let n = (bytes.len() - *pos).min(buf.len());
        buf[..n].copy_from_slice(&bytes[*pos..*pos + n]);
        *pos += n;
        Ok(n)
    }
}
