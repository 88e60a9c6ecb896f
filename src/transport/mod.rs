//! # Transport Layer
//!
//! Drives the packet codec over TCP connections: connect with a timeout,
//! optionally decorate the stream, send one packet and read one reply.
//!
//! ## Components
//! - **Session**: blocking exchange on `std::net::TcpStream`
//! - **AsyncSession**: tokio exchange through `Framed<_, PacketCodec>`
//! - **Decorator**: hook for wrapping the raw stream (TLS, PSK)
//!
//! No retries are made here; failover between cluster nodes is the sender's job.

pub mod async_session;
pub mod decorator;
pub mod session;

pub use async_session::{AsyncConnection, AsyncTransportSession};
pub use decorator::{AsyncConnectionDecorator, ConnectionDecorator};
pub use session::{Connection, TransportSession};
