//! Server nodes and failover clusters for the sender.
//!
//! Address syntax: clusters are separated by `,`, the nodes of one cluster by
//! `;`. A node without a port uses 10051.
//!
//! ```text
//! zbx-a.example.com;zbx-b.example.com:20051,proxy.example.com
//! ```

use std::fmt;
use std::str::FromStr;

use crate::config::DEFAULT_SENDER_PORT;
use crate::error::{ProtocolError, Result};

/// Wildcard listen address that stands for the local host.
const ANY_ADDRESS: &str = "0.0.0.0/0";
const LOCALHOST: &str = "127.0.0.1";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub address: String,
    pub port: u16,
}

impl Node {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        let address = address.into();
        let address = if address == ANY_ADDRESS {
            LOCALHOST.to_string()
        } else {
            address
        };
        Self { address, port }
    }
}

impl FromStr for Node {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ProtocolError::ConfigError("Empty node address".to_string()));
        }
        match raw.rsplit_once(':') {
            Some((address, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    ProtocolError::ConfigError(format!("Port must be an integer value: '{raw}'"))
                })?;
                Ok(Self::new(address, port))
            }
            None => Ok(Self::new(raw, DEFAULT_SENDER_PORT)),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Nodes of one high-availability cluster, tried in order until one accepts
/// the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    nodes: Vec<Node>,
}

impl Cluster {
    pub fn new(nodes: Vec<Node>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(ProtocolError::ConfigError(
                "Cluster must contain at least one node".to_string(),
            ));
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl FromStr for Cluster {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self> {
        let nodes = raw
            .split(';')
            .filter(|node| !node.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Node>>>()?;
        Self::new(nodes)
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes: Vec<String> = self.nodes.iter().map(Node::to_string).collect();
        write!(f, "[{}]", nodes.join(", "))
    }
}

/// Parse a comma-separated list of clusters.
pub fn parse_clusters(server: &str) -> Result<Vec<Cluster>> {
    let clusters = server
        .split(',')
        .filter(|cluster| !cluster.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Cluster>>>()?;
    if clusters.is_empty() {
        return Err(ProtocolError::ConfigError(
            "Sender server address cannot be empty".to_string(),
        ));
    }
    Ok(clusters)
}
