//! Blocking request/response exchange over TCP.

use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::core::packet::{self, Packet, HEADER_SIZE};
use crate::core::stream::read_exact;
use crate::error::{ProtocolError, Result};
use crate::protocol::cluster::Node;
use crate::transport::decorator::{ConnectionDecorator, ConnectionStream};

/// Map socket errors, turning expired socket timeouts into `Timeout`.
pub(crate) fn map_io(err: io::Error) -> ProtocolError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProtocolError::Timeout,
        _ => ProtocolError::Io(err),
    }
}

/// Connection parameters for one node.
#[derive(Clone)]
pub struct TransportSession {
    node: Node,
    timeout: Duration,
    decorator: Option<Arc<dyn ConnectionDecorator>>,
}

impl TransportSession {
    pub fn new(node: Node, timeout: Duration) -> Self {
        Self {
            node,
            timeout,
            decorator: None,
        }
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn ConnectionDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Open a connection with connect, read and write timeouts applied.
    ///
    /// # Errors
    /// `Timeout` if the connect times out, `Transport` if the address cannot
    /// be resolved or the connection is refused.
    #[instrument(skip(self), fields(node = %self.node))]
    pub fn connect(&self) -> Result<Connection> {
        let addrs = (self.node.address.as_str(), self.node.port)
            .to_socket_addrs()
            .map_err(|e| ProtocolError::Transport(format!("Cannot resolve {}: {e}", self.node)))?;

        let mut last_error =
            ProtocolError::Transport(format!("No addresses resolved for {}", self.node));
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    stream.set_nodelay(true)?;

                    let stream: Box<dyn ConnectionStream> = match &self.decorator {
                        Some(decorator) => decorator.decorate(stream)?,
                        None => Box::new(stream),
                    };
                    debug!("Connected to {}", self.node);
                    return Ok(Connection {
                        stream,
                        node: self.node.clone(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    debug!(
                        "The connection to {} timed out after {:?}",
                        self.node, self.timeout
                    );
                    last_error = ProtocolError::Timeout;
                }
                Err(e) => {
                    debug!("An error occurred while trying to connect to {}: {e}", self.node);
                    last_error =
                        ProtocolError::Transport(format!("Cannot connect to {}: {e}", self.node));
                }
            }
        }
        Err(last_error)
    }

    /// Connect, send `packet` and return the decoded reply.
    pub fn exchange(&self, packet: &Packet) -> Result<String> {
        self.connect()?.exchange(packet)
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("node", &self.node)
            .field("timeout", &self.timeout)
            .field("decorated", &self.decorator.is_some())
            .finish()
    }
}

/// An open connection to a node.
pub struct Connection {
    stream: Box<dyn ConnectionStream>,
    node: Node,
}

impl Connection {
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Send `packet` and read one reply packet.
    ///
    /// A peer that closes before a full header or payload arrives yields
    /// `InvalidHeader`.
    #[instrument(skip(self, packet), fields(node = %self.node))]
    pub fn exchange(&mut self, packet: &Packet) -> Result<String> {
        self.stream.write_all(&packet.to_bytes()).map_err(map_io)?;
        self.stream.flush().map_err(map_io)?;

        let header = read_exact(&mut self.stream, HEADER_SIZE).map_err(map_io)?;
        let parsed = packet::parse_header(&header)?;
        let payload =
            read_exact(&mut self.stream, parsed.data_length as usize).map_err(map_io)?;
        let reply = packet::decode(&header, &payload)?;

        debug!("Response from {}: {}", self.node, reply);
        Ok(reply)
    }
}
