//! Value push client (trapper protocol).
//!
//! Items are split into chunks of `chunk_size`. Every cluster receives every
//! chunk; within a cluster the nodes are tried in order until one accepts the
//! connection. Only connect failures move on to the next node: once connected,
//! any error ends the send.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, instrument};

use crate::config::SenderConfig;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};
use crate::protocol::cluster::Cluster;
use crate::protocol::item::{sender_request, ItemValue};
use crate::protocol::response::{SenderResponse, TrapperResult};
use crate::transport::async_session::{AsyncConnection, AsyncTransportSession};
use crate::transport::decorator::{AsyncConnectionDecorator, ConnectionDecorator};
use crate::transport::session::{Connection, TransportSession};

/// Chunking, packet building and reply parsing shared by [`Sender`] and
/// [`AsyncSender`].
#[derive(Debug, Clone)]
pub struct SenderCore {
    clusters: Vec<Cluster>,
    chunk_size: usize,
    compression: bool,
    timeout: Duration,
}

impl SenderCore {
    pub fn new(config: &SenderConfig) -> Result<Self> {
        config.validate_strict()?;
        Ok(Self {
            clusters: config.clusters()?,
            chunk_size: config.chunk_size,
            compression: config.compression,
            timeout: config.timeout,
        })
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Items grouped into chunks, numbered from 1.
    pub fn chunks<'a>(&self, items: &'a [ItemValue]) -> impl Iterator<Item = (usize, &'a [ItemValue])> {
        items
            .chunks(self.chunk_size)
            .enumerate()
            .map(|(idx, chunk)| (idx + 1, chunk))
    }

    /// `sender data` packet for one chunk.
    pub fn packet(&self, items: &[ItemValue]) -> Result<Packet> {
        Packet::new(sender_request(items), self.compression)
    }

    pub fn parse_reply(reply: &str, chunk: usize) -> Result<TrapperResult> {
        TrapperResult::parse(reply, chunk)
    }

    fn unreachable(cluster: &Cluster) -> ProtocolError {
        error!("Couldn't connect to all of cluster nodes: {cluster}");
        ProtocolError::Transport(format!("Couldn't connect to all of cluster nodes: {cluster}"))
    }
}

/// Blocking sender.
///
/// ```no_run
/// use zabbix_protocol::config::SenderConfig;
/// use zabbix_protocol::protocol::ItemValue;
/// use zabbix_protocol::service::Sender;
///
/// let sender = Sender::new(SenderConfig::default())?;
/// let response = sender.send(&[
///     ItemValue::new("host1", "item.key1", 10),
///     ItemValue::new("host1", "item.key2", "test message"),
/// ])?;
/// assert!(response.is_success());
/// # Ok::<(), zabbix_protocol::error::ProtocolError>(())
/// ```
#[derive(Clone)]
pub struct Sender {
    core: SenderCore,
    decorator: Option<Arc<dyn ConnectionDecorator>>,
}

impl Sender {
    pub fn new(config: SenderConfig) -> Result<Self> {
        Ok(Self {
            core: SenderCore::new(&config)?,
            decorator: None,
        })
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn ConnectionDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn core(&self) -> &SenderCore {
        &self.core
    }

    /// Send a single value.
    pub fn send_value(
        &self,
        host: &str,
        key: &str,
        value: impl ToString,
        clock: Option<i64>,
        ns: Option<i64>,
    ) -> Result<SenderResponse> {
        let mut item = ItemValue::new(host, key, value);
        item.clock = clock;
        item.ns = ns;
        self.send(&[item])
    }

    /// Send `items`, chunked, to every cluster.
    pub fn send(&self, items: &[ItemValue]) -> Result<SenderResponse> {
        let mut response = SenderResponse::default();
        for (number, chunk) in self.core.chunks(items) {
            let packet = self.core.packet(chunk)?;
            self.send_chunk(&packet, number, &mut response)?;
        }
        Ok(response)
    }

    #[instrument(skip(self, packet, response))]
    fn send_chunk(&self, packet: &Packet, chunk: usize, response: &mut SenderResponse) -> Result<()> {
        for cluster in self.core.clusters() {
            let mut conn = self.connect_any(cluster)?;
            let reply = conn.exchange(packet)?;
            let result = SenderCore::parse_reply(&reply, chunk)?;
            response.add(conn.node().clone(), result);
        }
        Ok(())
    }

    fn connect_any(&self, cluster: &Cluster) -> Result<Connection> {
        for node in cluster.nodes() {
            debug!("Trying to send data to {node}");
            let mut session = TransportSession::new(node.clone(), self.core.timeout());
            if let Some(decorator) = &self.decorator {
                session = session.with_decorator(Arc::clone(decorator));
            }
            match session.connect() {
                Ok(conn) => return Ok(conn),
                Err(e) => debug!("Node {node} is unavailable: {e}"),
            }
        }
        Err(SenderCore::unreachable(cluster))
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("core", &self.core)
            .field("decorated", &self.decorator.is_some())
            .finish()
    }
}

/// Async sender.
#[derive(Clone)]
pub struct AsyncSender {
    core: SenderCore,
    decorator: Option<Arc<dyn AsyncConnectionDecorator>>,
}

impl AsyncSender {
    pub fn new(config: SenderConfig) -> Result<Self> {
        Ok(Self {
            core: SenderCore::new(&config)?,
            decorator: None,
        })
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn AsyncConnectionDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn core(&self) -> &SenderCore {
        &self.core
    }

    pub async fn send_value(
        &self,
        host: &str,
        key: &str,
        value: impl ToString,
        clock: Option<i64>,
        ns: Option<i64>,
    ) -> Result<SenderResponse> {
        let mut item = ItemValue::new(host, key, value);
        item.clock = clock;
        item.ns = ns;
        self.send(&[item]).await
    }

    pub async fn send(&self, items: &[ItemValue]) -> Result<SenderResponse> {
        let mut response = SenderResponse::default();
        for (number, chunk) in self.core.chunks(items) {
            let packet = self.core.packet(chunk)?;
            for cluster in self.core.clusters() {
                let mut conn = self.connect_any(cluster).await?;
                let reply = conn.exchange(packet.clone()).await?;
                let result = SenderCore::parse_reply(&reply, number)?;
                response.add(conn.node().clone(), result);
            }
        }
        Ok(response)
    }

    async fn connect_any(&self, cluster: &Cluster) -> Result<AsyncConnection> {
        for node in cluster.nodes() {
            debug!("Trying to send data to {node}");
            let mut session = AsyncTransportSession::new(node.clone(), self.core.timeout());
            if let Some(decorator) = &self.decorator {
                session = session.with_decorator(Arc::clone(decorator));
            }
            match session.connect().await {
                Ok(conn) => return Ok(conn),
                Err(e) => debug!("Node {node} is unavailable: {e}"),
            }
        }
        Err(SenderCore::unreachable(cluster))
    }
}

impl std::fmt::Debug for AsyncSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSender")
            .field("core", &self.core)
            .field("decorated", &self.decorator.is_some())
            .finish()
    }
}
