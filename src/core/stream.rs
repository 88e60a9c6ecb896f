//! Blocking reads of exact-size chunks from a connection.

use std::io::{self, Read};

use tracing::debug;

/// Receive up to `size` bytes from `conn`.
///
/// Keeps reading until `size` bytes have been accumulated or the peer closes
/// the connection. A short result is returned as-is; it is never padded, so the
/// caller's header and length checks reject it.
pub fn read_exact<R: Read + ?Sized>(conn: &mut R, size: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(size.min(64 * 1024));
    conn.take(size as u64).read_to_end(&mut buf)?;

    if buf.len() < size {
        debug!(
            expected = size,
            received = buf.len(),
            "Socket connection was closed before receiving expected amount of data"
        );
    }
    Ok(buf)
}
