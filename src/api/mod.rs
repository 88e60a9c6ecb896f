//! # JSON-RPC API Client
//!
//! Clients for the Zabbix JSON-RPC API (`api_jsonrpc.php`).
//!
//! ## Components
//! - **Version**: parsing and ordering of `apiinfo.version` results
//! - **Envelope**: JSON-RPC 2.0 request/response bodies
//! - **Http**: transport traits with `reqwest` implementations
//! - **Session**: request building, token placement and auth state shared by both clients
//! - **Client / AsyncClient**: blocking and async front ends
//!
//! ## Authentication
//! - A static token is used as-is; logout only forgets it
//! - User and password log in lazily before the first authenticated call
//! - `apiinfo.version`, `user.login` and `user.checkAuthentication` never carry a token
//! - From 6.4 the token is sent as `Authorization: Bearer`, unless HTTP Basic
//!   auth occupies that header, in which case it goes into the body

pub mod async_client;
pub mod client;
pub mod envelope;
pub mod http;
pub mod session;
pub mod version;

pub use async_client::AsyncApiClient;
pub use client::ApiClient;
pub use http::{AsyncHttpTransport, HttpRequest, HttpResponse, HttpTransport};
pub use session::ApiObject;
pub use version::APIVersion;
