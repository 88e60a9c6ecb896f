//! # Utility Modules
//!
//! Supporting utilities for compression, secret handling and logging.
//!
//! ## Components
//! - **Compression**: zlib with a decompression size limit
//! - **Redact**: masking of tokens and passwords in log output
//! - **Secret**: credential wrapper with redacted `Debug` and zeroize-on-drop
//! - **Logging**: `tracing-subscriber` initialization for applications
//!
//! ## Security
//! - Decompression bomb protection (bounded by `MAX_PAYLOAD_SIZE`)
//! - Memory zeroing for credentials (zeroize crate)

pub mod compression;
pub mod logging;
pub mod redact;
pub mod secret;

pub use redact::{mask_secret, RedactRule, Redactor};
pub use secret::SecretString;
