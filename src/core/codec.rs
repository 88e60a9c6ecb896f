//! Tokio codec framing `ZBXD` packets over a byte stream.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::config::MAGIC_BYTES;
use crate::core::packet::{self, Header, Packet, HEADER_SIZE};
use crate::error::{ProtocolError, Result};

/// Upper bound on buffer growth per call while waiting for a frame body.
const MAX_RESERVE: usize = 64 * 1024;

/// Frames outgoing [`Packet`]s and decodes incoming frames into text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec;

impl Decoder for PacketCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let magic_len = src.len().min(MAGIC_BYTES.len());
        if src[..magic_len] != MAGIC_BYTES[..magic_len] {
            return Err(ProtocolError::InvalidHeader);
        }

        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let header = Header::parse(&src[..HEADER_SIZE])?;
        let frame_len = HEADER_SIZE + header.data_length as usize;
        if src.len() < frame_len {
            // The header length is untrusted; grow with the data that arrives.
            src.reserve((frame_len - src.len()).min(MAX_RESERVE));
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        packet::decode(&frame[..HEADER_SIZE], &frame[HEADER_SIZE..]).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => {
                debug!(
                    received = buf.len(),
                    "Connection closed in the middle of a packet"
                );
                buf.advance(buf.len());
                Err(ProtocolError::InvalidHeader)
            }
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(HEADER_SIZE + item.payload.len());
        dst.extend_from_slice(&item.header.to_bytes());
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}
