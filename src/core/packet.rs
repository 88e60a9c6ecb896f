//! `ZBXD` packet encoding and decoding.
//!
//! ## Wire Format
//! ```text
//! [Magic "ZBXD"(4)] [Flags(1)] [DataLength(4) LE] [Reserved(4) LE] [Payload(N)]
//! ```
//!
//! `DataLength` is the number of payload bytes on the wire. When the payload is
//! compressed, `Reserved` holds the uncompressed length; otherwise it is zero.

use serde_json::Value;
use tracing::debug;

use crate::config::{MAGIC_BYTES, MAX_PAYLOAD_SIZE};
use crate::error::{ProtocolError, Result};
use crate::utils::compression;
use crate::utils::redact::shorten;

/// Size of the fixed packet header in bytes.
pub const HEADER_SIZE: usize = 13;

/// Maximum characters of request text written to the debug log.
const LOG_PREVIEW_LEN: usize = 200;

/// Header flag bits.
pub mod flags {
    /// Packet uses the Zabbix communications protocol. Always set on send.
    pub const PROTOCOL: u8 = 0x01;
    /// Payload is zlib-compressed.
    pub const COMPRESSED: u8 = 0x02;
    /// Large packet mode (64-bit lengths). Not supported.
    pub const LARGE_PACKET: u8 = 0x04;
}

/// Data accepted as a packet payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
    /// Structured payload; must be a JSON array or object.
    Json(Value),
}

impl Payload {
    /// Serialize the payload to the bytes that go on the wire.
    ///
    /// # Errors
    /// Returns `ProtocolError::UnsupportedPayloadType` for JSON scalars.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Payload::Bytes(bytes) => Ok(bytes),
            Payload::Text(text) => Ok(text.into_bytes()),
            Payload::Json(value @ (Value::Array(_) | Value::Object(_))) => {
                Ok(serde_json::to_vec(&value)?)
            }
            Payload::Json(other) => Err(ProtocolError::UnsupportedPayloadType(
                json_type_name(&other).to_string(),
            )),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub flags: u8,
    pub data_length: u32,
    pub reserved: u32,
}

impl Header {
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flags & flags::COMPRESSED != 0
    }

    /// Pack the header into its little-endian wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&MAGIC_BYTES);
        out[4] = self.flags;
        out[5..9].copy_from_slice(&self.data_length.to_le_bytes());
        out[9..13].copy_from_slice(&self.reserved.to_le_bytes());
        out
    }

    /// Validate and unpack a received header.
    ///
    /// # Errors
    /// - `InvalidHeader` if `bytes` is not exactly 13 bytes or lacks the magic
    /// - `LargePacketUnsupported` if the large-packet bit is set
    /// - `UnexpectedFlags` if the protocol bit is unset
    /// - `OversizedPacket` if the declared length exceeds `MAX_PAYLOAD_SIZE`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HEADER_SIZE || bytes[..4] != MAGIC_BYTES {
            debug!(header = ?bytes, "Unexpected response header received");
            return Err(ProtocolError::InvalidHeader);
        }

        let flags = bytes[4];
        let data_length = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
        let reserved = u32::from_le_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]);

        if flags & flags::LARGE_PACKET != 0 {
            return Err(ProtocolError::LargePacketUnsupported);
        }
        if flags & flags::PROTOCOL == 0 {
            return Err(ProtocolError::UnexpectedFlags(flags));
        }
        if data_length as usize > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizedPacket(data_length as usize));
        }

        Ok(Self {
            flags,
            data_length,
            reserved,
        })
    }
}

/// A complete `ZBXD` packet as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    /// Payload bytes as transmitted (compressed if the header says so).
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a packet from `payload`, compressing it when requested.
    pub fn new(payload: impl Into<Payload>, compress: bool) -> Result<Self> {
        let request = payload.into().into_bytes()?;

        debug!(
            "Request data: {}",
            shorten(&String::from_utf8_lossy(&request), LOG_PREVIEW_LEN)
        );

        let mut flags = flags::PROTOCOL;
        let mut reserved = 0u32;
        let body = if compress {
            flags |= flags::COMPRESSED;
            reserved = wire_len(request.len())?;
            compression::compress(&request)?
        } else {
            request
        };

        Ok(Self {
            header: Header {
                flags,
                data_length: wire_len(body.len())?,
                reserved,
            },
            payload: body,
        })
    }

    /// Serialize header and payload into a single buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse a complete packet from `bytes`.
    ///
    /// # Errors
    /// Header errors as in [`Header::parse`]; `InvalidHeader` if the number of
    /// payload bytes differs from the declared length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::InvalidHeader);
        }
        let header = Header::parse(&bytes[..HEADER_SIZE])?;
        let payload = &bytes[HEADER_SIZE..];
        if payload.len() != header.data_length as usize {
            return Err(ProtocolError::InvalidHeader);
        }

        Ok(Self {
            header,
            payload: payload.to_vec(),
        })
    }

    /// Payload as text, inflated if the packet is compressed.
    pub fn text(&self) -> Result<String> {
        payload_text(&self.header, &self.payload)
    }
}

fn wire_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ProtocolError::OversizedPacket(len))
}

fn payload_text(header: &Header, payload: &[u8]) -> Result<String> {
    let body = compression::maybe_decompress(payload, header.is_compressed())?;
    String::from_utf8(body).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Encode `payload` into a complete wire packet.
pub fn encode(payload: impl Into<Payload>, compress: bool) -> Result<Vec<u8>> {
    Ok(Packet::new(payload, compress)?.to_bytes())
}

/// Validate and unpack a received header.
pub fn parse_header(bytes: &[u8]) -> Result<Header> {
    Header::parse(bytes)
}

/// Decode a received packet into its text body.
///
/// `payload` must hold exactly the number of bytes the header declares; a
/// shorter buffer (the peer closed early) is rejected as `InvalidHeader`.
pub fn decode(header: &[u8], payload: &[u8]) -> Result<String> {
    let header = Header::parse(header)?;
    if payload.len() != header.data_length as usize {
        debug!(
            expected = header.data_length,
            received = payload.len(),
            "Connection was closed before receiving expected amount of data"
        );
        return Err(ProtocolError::InvalidHeader);
    }
    payload_text(&header, payload)
}
