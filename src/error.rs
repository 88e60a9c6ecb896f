//! # Error Types
//!
//! Error handling for the wire protocol, the transport sessions and the
//! JSON-RPC API client.
//!
//! All fallible operations in this crate return [`Result`], whose error type is
//! [`ProtocolError`]. Variants are grouped into broad categories via
//! [`ProtocolError::kind`] so callers can branch on the failure class without
//! matching every variant:
//!
//! ## Error Categories
//! - **Protocol**: bad magic or header length, unexpected flags, large packets
//! - **Transport**: connection refused, timeouts, premature close, HTTP failures
//! - **Serialization**: unsupported payload types, invalid UTF-8, bad JSON
//! - **Auth**: missing login, unsupported token usage
//! - **ApiRequest**: JSON-RPC errors reported by the server, carried verbatim
//! - **Config**: invalid configuration values
//!
//! Nothing in this crate retries on error; every failure surfaces to the caller
//! of the operation that triggered it.
//!
//! ## Example Usage
//! ```rust
//! use zabbix_protocol::core::packet::{decode, HEADER_SIZE};
//! use zabbix_protocol::error::{ErrorKind, ProtocolError};
//!
//! let err = decode(b"ZBXD\x01", b"").unwrap_err();
//! assert!(matches!(err, ProtocolError::InvalidHeader));
//! assert_eq!(err.kind(), ErrorKind::Protocol);
//! assert_eq!(HEADER_SIZE, 13);
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Packet validation errors
    pub const ERR_UNEXPECTED_RESPONSE: &str = "Unexpected response was received";
    pub const ERR_LARGE_PACKET: &str = "Large packet unsupported";

    /// Connection errors
    pub const ERR_TIMEOUT: &str = "Operation timed out";

    /// Auth errors
    pub const ERR_NOT_LOGGED_IN: &str = "You're not logged in Zabbix API";
    pub const ERR_NO_CREDENTIALS: &str = "Either a token or a user and a password must be specified";

    /// Synchronization errors
    pub const ERR_LOCK_POISONED: &str = "Synchronization primitive poisoned";
}

/// Broad failure class of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Protocol,
    Transport,
    Serialization,
    Auth,
    ApiRequest,
    Config,
}

// ProtocolError is the primary error type for all operations of this crate
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("{}", constants::ERR_UNEXPECTED_RESPONSE)]
    InvalidHeader,

    #[error("Unexpected flags were received: {0:#04x}")]
    UnexpectedFlags(u8),

    #[error("{}", constants::ERR_LARGE_PACKET)]
    LargePacketUnsupported,

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{}", constants::ERR_TIMEOUT)]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unsupported payload type: {0}")]
    UnsupportedPayloadType(String),

    #[error("Response is not valid UTF-8")]
    InvalidUtf8,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Compression failed")]
    CompressionFailure,

    #[error("Decompression failed")]
    DecompressionFailure,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("{feature} is not supported by Zabbix API version {version}")]
    UnsupportedVersion { feature: String, version: String },

    #[error("API request error ({code}): {message} {data}")]
    ApiRequest {
        code: i64,
        message: String,
        data: String,
    },

    #[error("Invalid API version: {0}")]
    InvalidVersion(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Classify the error into its broad failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHeader
            | Self::UnexpectedFlags(_)
            | Self::LargePacketUnsupported
            | Self::OversizedPacket(_)
            | Self::UnexpectedResponse(_) => ErrorKind::Protocol,
            Self::Io(_) | Self::Transport(_) | Self::Timeout | Self::Http(_) => {
                ErrorKind::Transport
            }
            Self::UnsupportedPayloadType(_)
            | Self::InvalidUtf8
            | Self::Json(_)
            | Self::CompressionFailure
            | Self::DecompressionFailure => ErrorKind::Serialization,
            Self::Auth(_) | Self::UnsupportedVersion { .. } => ErrorKind::Auth,
            Self::ApiRequest { .. } => ErrorKind::ApiRequest,
            Self::InvalidVersion(_) | Self::ConfigError(_) => ErrorKind::Config,
        }
    }
}

impl From<reqwest::Error> for ProtocolError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProtocolError::Timeout
        } else {
            ProtocolError::Http(error.to_string())
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
