//! # Protocol Data
//!
//! Request and response bodies carried inside `ZBXD` packets.
//!
//! - **Item**: values pushed by the sender and the `sender data` request
//! - **Response**: trapper counters, aggregated sender results, agent replies
//! - **Cluster**: server nodes and failover clusters

pub mod cluster;
pub mod item;
pub mod response;

pub use cluster::{Cluster, Node};
pub use item::ItemValue;
pub use response::{AgentResponse, SenderResponse, TrapperResult};
