//! Value pull client (passive agent checks).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::GetterConfig;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};
use crate::protocol::cluster::Node;
use crate::protocol::response::AgentResponse;
use crate::transport::async_session::AsyncTransportSession;
use crate::transport::decorator::{AsyncConnectionDecorator, ConnectionDecorator};
use crate::transport::session::TransportSession;

fn request_packet(key: &str) -> Result<Packet> {
    Packet::new(key, false)
}

fn log_failure(node: &Node, err: &ProtocolError) {
    match err {
        ProtocolError::Io(io) if io.kind() == std::io::ErrorKind::ConnectionReset => {
            debug!("Get value error: {io}");
            warn!("Check access restrictions in Zabbix agent configuration.");
        }
        other => debug!("Request to {node} failed: {other}"),
    }
}

/// Blocking agent client.
///
/// ```no_run
/// use zabbix_protocol::config::GetterConfig;
/// use zabbix_protocol::service::Getter;
///
/// let agent = Getter::new(GetterConfig::default())?;
/// let response = agent.get("system.uname")?;
/// println!("{:?}", response.value);
/// # Ok::<(), zabbix_protocol::error::ProtocolError>(())
/// ```
#[derive(Clone)]
pub struct Getter {
    node: Node,
    timeout: Duration,
    decorator: Option<Arc<dyn ConnectionDecorator>>,
}

impl Getter {
    pub fn new(config: GetterConfig) -> Result<Self> {
        config.validate_strict()?;
        Ok(Self {
            node: Node::new(config.host, config.port),
            timeout: config.timeout,
            decorator: None,
        })
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn ConnectionDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Request the value of `key` from the agent.
    #[instrument(skip(self), fields(node = %self.node))]
    pub fn get(&self, key: &str) -> Result<AgentResponse> {
        let mut session = TransportSession::new(self.node.clone(), self.timeout);
        if let Some(decorator) = &self.decorator {
            session = session.with_decorator(Arc::clone(decorator));
        }
        let raw = session
            .exchange(&request_packet(key)?)
            .inspect_err(|e| log_failure(&self.node, e))?;
        Ok(AgentResponse::parse(raw))
    }
}

impl std::fmt::Debug for Getter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Getter")
            .field("node", &self.node)
            .field("timeout", &self.timeout)
            .field("decorated", &self.decorator.is_some())
            .finish()
    }
}

/// Async agent client.
#[derive(Clone)]
pub struct AsyncGetter {
    node: Node,
    timeout: Duration,
    decorator: Option<Arc<dyn AsyncConnectionDecorator>>,
}

impl AsyncGetter {
    pub fn new(config: GetterConfig) -> Result<Self> {
        config.validate_strict()?;
        Ok(Self {
            node: Node::new(config.host, config.port),
            timeout: config.timeout,
            decorator: None,
        })
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn AsyncConnectionDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    #[instrument(skip(self), fields(node = %self.node))]
    pub async fn get(&self, key: &str) -> Result<AgentResponse> {
        let mut session = AsyncTransportSession::new(self.node.clone(), self.timeout);
        if let Some(decorator) = &self.decorator {
            session = session.with_decorator(Arc::clone(decorator));
        }
        let raw = session
            .exchange(request_packet(key)?)
            .await
            .inspect_err(|e| log_failure(&self.node, e))?;
        Ok(AgentResponse::parse(raw))
    }
}

impl std::fmt::Debug for AsyncGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncGetter")
            .field("node", &self.node)
            .field("timeout", &self.timeout)
            .field("decorated", &self.decorator.is_some())
            .finish()
    }
}
