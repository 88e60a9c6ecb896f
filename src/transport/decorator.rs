//! Connection decorators.
//!
//! A decorator receives the freshly connected TCP stream and returns the
//! stream the packet exchange runs over, e.g. a TLS or PSK session. Sessions
//! themselves contain no security logic.

use std::io::{Read, Write};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Blocking byte stream a session can exchange packets over.
pub trait ConnectionStream: Read + Write + Send {}

impl<T: Read + Write + Send> ConnectionStream for T {}

/// Async byte stream a session can exchange packets over.
pub trait AsyncConnectionStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncConnectionStream for T {}

/// Wraps a blocking TCP connection before use.
pub trait ConnectionDecorator: Send + Sync {
    fn decorate(&self, stream: std::net::TcpStream) -> Result<Box<dyn ConnectionStream>>;
}

/// Wraps an async TCP connection before use.
#[async_trait]
pub trait AsyncConnectionDecorator: Send + Sync {
    async fn decorate(
        &self,
        stream: tokio::net::TcpStream,
    ) -> Result<Box<dyn AsyncConnectionStream>>;
}
