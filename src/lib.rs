//! # zabbix-protocol
//!
//! Client-side building blocks for talking to a Zabbix server, proxy or agent.
//!
//! ## Surfaces
//! - **Binary protocol**: `ZBXD`-framed packets with optional zlib compression,
//!   used to push item values to a trapper ([`service::Sender`]) and to pull a
//!   value from a passive agent ([`service::Getter`])
//! - **JSON-RPC API**: [`api::ApiClient`] and [`api::AsyncApiClient`] with lazy
//!   version detection, login and token handling
//!
//! Every client comes in a blocking and a tokio flavour sharing the same
//! request building and response parsing.
//!
//! ## Modules
//! - [`core`]: packet encoding/decoding, tokio codec, exact-size reads
//! - [`transport`]: TCP sessions with optional stream decorators
//! - [`protocol`]: sender items, trapper/agent responses, clusters
//! - [`service`]: sender and getter clients
//! - [`api`]: JSON-RPC API clients
//! - [`config`]: configuration structs with TOML and environment loading
//! - [`utils`]: compression, secret redaction, logging setup
//! - [`error`]: the crate-wide [`ProtocolError`]
//!
//! ## Example
//! ```no_run
//! use zabbix_protocol::config::SenderConfig;
//! use zabbix_protocol::service::Sender;
//!
//! let sender = Sender::new(SenderConfig::default())?;
//! let response = sender.send_value("host", "item.key", 42, None, None)?;
//! println!("processed {} of {}", response.processed, response.total);
//! # Ok::<(), zabbix_protocol::error::ProtocolError>(())
//! ```
//!
//! Logging goes through `tracing`; the library never installs a subscriber.
//! Call [`utils::logging::init_logging`] or bring your own.

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use api::{APIVersion, ApiClient, AsyncApiClient};
pub use config::ClientConfig;
pub use error::{ErrorKind, ProtocolError, Result};
pub use protocol::{AgentResponse, ItemValue, SenderResponse};
pub use service::{AsyncGetter, AsyncSender, Getter, Sender};
