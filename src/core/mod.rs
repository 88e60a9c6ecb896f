//! # Core Protocol Components
//!
//! Low-level packet handling for the Zabbix wire protocol.
//!
//! This module provides the foundation for the sender and getter clients,
//! handling packet framing, compression and exact-size reads.
//!
//! ## Components
//! - **Packet**: `ZBXD` header + payload encoding and validation
//! - **Codec**: Tokio codec for framing over byte streams
//! - **Stream**: blocking exact-size reads that never pad short input
//!
//! ## Wire Format
//! ```text
//! [Magic "ZBXD"(4)] [Flags(1)] [DataLength(4)] [Reserved(4)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Maximum packet size: 1 GiB (declared lengths are checked before allocation)
//! - Magic bytes prevent accidental misinterpretation
//! - Large-packet mode is rejected outright

pub mod codec;
pub mod packet;
pub mod stream;
