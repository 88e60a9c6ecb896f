//! Async request/response exchange over TCP.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

use crate::core::codec::PacketCodec;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};
use crate::protocol::cluster::Node;
use crate::transport::decorator::{AsyncConnectionDecorator, AsyncConnectionStream};
use crate::transport::session::map_io;

/// Connection parameters for one node.
///
/// Every step (connect, send, receive) is bounded by `timeout`. Dropping the
/// returned future aborts the exchange and closes the socket.
#[derive(Clone)]
pub struct AsyncTransportSession {
    node: Node,
    timeout: Duration,
    decorator: Option<Arc<dyn AsyncConnectionDecorator>>,
}

impl AsyncTransportSession {
    pub fn new(node: Node, timeout: Duration) -> Self {
        Self {
            node,
            timeout,
            decorator: None,
        }
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn AsyncConnectionDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    #[instrument(skip(self), fields(node = %self.node))]
    pub async fn connect(&self) -> Result<AsyncConnection> {
        let stream = timeout(
            self.timeout,
            TcpStream::connect((self.node.address.as_str(), self.node.port)),
        )
        .await
        .map_err(|_| {
            debug!(
                "The connection to {} timed out after {:?}",
                self.node, self.timeout
            );
            ProtocolError::Timeout
        })?
        .map_err(|e| {
            debug!("An error occurred while trying to connect to {}: {e}", self.node);
            ProtocolError::Transport(format!("Cannot connect to {}: {e}", self.node))
        })?;
        stream.set_nodelay(true)?;

        let stream: Box<dyn AsyncConnectionStream> = match &self.decorator {
            Some(decorator) => timeout(self.timeout, decorator.decorate(stream))
                .await
                .map_err(|_| ProtocolError::Timeout)??,
            None => Box::new(stream),
        };
        debug!("Connected to {}", self.node);

        Ok(AsyncConnection {
            framed: Framed::new(stream, PacketCodec),
            node: self.node.clone(),
            timeout: self.timeout,
        })
    }

    /// Connect, send `packet` and return the decoded reply.
    pub async fn exchange(&self, packet: Packet) -> Result<String> {
        self.connect().await?.exchange(packet).await
    }
}

impl std::fmt::Debug for AsyncTransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTransportSession")
            .field("node", &self.node)
            .field("timeout", &self.timeout)
            .field("decorated", &self.decorator.is_some())
            .finish()
    }
}

/// An open async connection to a node.
pub struct AsyncConnection {
    framed: Framed<Box<dyn AsyncConnectionStream>, PacketCodec>,
    node: Node,
    timeout: Duration,
}

impl AsyncConnection {
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Send `packet` and read one reply packet.
    #[instrument(skip(self, packet), fields(node = %self.node))]
    pub async fn exchange(&mut self, packet: Packet) -> Result<String> {
        timeout(self.timeout, self.framed.send(packet))
            .await
            .map_err(|_| ProtocolError::Timeout)?
            .map_err(|e| match e {
                ProtocolError::Io(io) => map_io(io),
                other => other,
            })?;

        let reply = match timeout(self.timeout, self.framed.next())
            .await
            .map_err(|_| ProtocolError::Timeout)?
        {
            Some(reply) => reply?,
            None => {
                debug!("Connection to {} was closed before a response arrived", self.node);
                return Err(ProtocolError::InvalidHeader);
            }
        };

        debug!("Response from {}: {}", self.node, reply);
        Ok(reply)
    }
}
