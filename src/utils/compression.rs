use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::config::MAX_PAYLOAD_SIZE;
use crate::error::{ProtocolError, Result};

/// Maximum output size for decompression (align with MAX_PAYLOAD_SIZE to prevent DoS)
const MAX_DECOMPRESSION_SIZE: usize = MAX_PAYLOAD_SIZE;

/// Compresses data into a zlib stream, the format used by the `ZBXD`
/// compressed-packet flag.
///
/// # Errors
/// Returns `ProtocolError::CompressionFailure` if compression fails
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|_| ProtocolError::CompressionFailure)?;
    encoder.finish().map_err(|_| ProtocolError::CompressionFailure)
}

/// Decompresses a zlib stream.
///
/// Enforces a maximum output size limit to prevent decompression bombs.
///
/// # Errors
/// Returns `ProtocolError::DecompressionFailure` if:
/// - The stream is malformed or truncated
/// - Output size exceeds MAX_DECOMPRESSION_SIZE
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(2));
    let mut reader = ZlibDecoder::new(data);

    // Read in chunks to enforce size limit
    let mut buffer = [0u8; 8192];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break, // EOF
            Ok(n) => {
                out.extend_from_slice(&buffer[..n]);
                if out.len() > MAX_DECOMPRESSION_SIZE {
                    return Err(ProtocolError::DecompressionFailure);
                }
            }
            Err(_) => return Err(ProtocolError::DecompressionFailure),
        }
    }
    Ok(out)
}

/// Decompress data only if it was previously compressed; otherwise return as-is.
pub fn maybe_decompress(data: &[u8], was_compressed: bool) -> Result<Vec<u8>> {
    if was_compressed {
        decompress(data)
    } else {
        Ok(data.to_vec())
    }
}
