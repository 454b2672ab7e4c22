//! `tokio_util::codec` adapters for use with `Framed`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{
    decode_request, decode_response, encode_request, encode_response, RequestFrame, ResponseFrame,
};
use crate::error::FrameError;

/// Server side: decodes requests, encodes replies.
///
/// Bytes left over at end of stream are reported as an I/O error by the
/// default `decode_eof`, so a peer that disconnects mid-frame never gets a reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerCodec;

impl Decoder for ServerCodec {
    type Item = RequestFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_request(src)
    }
}

impl Encoder<ResponseFrame> for ServerCodec {
    type Error = FrameError;

    fn encode(&mut self, item: ResponseFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_response(&item, dst)
    }
}

/// Client side: encodes requests, decodes replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientCodec;

impl Decoder for ClientCodec {
    type Item = ResponseFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_response(src)
    }
}

impl Encoder<RequestFrame> for ClientCodec {
    type Error = FrameError;

    fn encode(&mut self, item: RequestFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_request(&item, dst)
    }
}
