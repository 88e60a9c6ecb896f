//! # Services
//!
//! Client front ends for the binary protocol.
//!
//! - **Sender**: pushes item values to trapper clusters, with chunking and failover
//! - **Getter**: pulls a single value from a passive agent
//!
//! Each comes in a blocking and an async flavour over the same request
//! building and reply parsing.

pub mod getter;
pub mod sender;

pub use getter::{AsyncGetter, Getter};
pub use sender::{AsyncSender, Sender, SenderCore};
