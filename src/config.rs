//! # Configuration Management
//!
//! Centralized configuration for the sender, getter and API clients.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Direct instantiation with defaults
//! - Environment variables via `from_env()` (`ZABBIX_URL`, `ZABBIX_USER`,
//!   `ZABBIX_PASSWORD`, `ZABBIX_TOKEN`)
//!
//! ## Security Considerations
//! - Passwords and tokens are held as [`SecretString`]: redacted in `Debug`,
//!   serialized as a mask, zeroized on drop
//! - Certificate validation is on by default

use crate::error::{ProtocolError, Result};
use crate::protocol::cluster::{parse_clusters, Cluster};
use crate::utils::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Magic bytes opening every protocol packet ("ZBXD")
pub const MAGIC_BYTES: [u8; 4] = *b"ZBXD";

/// Max allowed payload size (1 GB, matching the server-side receive limit)
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024 * 1024;

/// Default trapper port of Zabbix server/proxy
pub const DEFAULT_SENDER_PORT: u16 = 10051;

/// Default passive agent port
pub const DEFAULT_AGENT_PORT: u16 = 10050;

/// Default number of items in one sender packet
pub const DEFAULT_CHUNK_SIZE: usize = 250;

/// Default socket timeout for sender and getter
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Default HTTP timeout for the API client
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Default API endpoint
pub const DEFAULT_API_URL: &str = "http://localhost/zabbix/api_jsonrpc.php";

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ClientConfig {
    /// Sender (trapper) configuration
    #[serde(default)]
    pub sender: SenderConfig,

    /// Getter (passive agent) configuration
    #[serde(default)]
    pub getter: GetterConfig,

    /// JSON-RPC API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.api.apply_env();
        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.sender.validate());
        errors.extend(self.getter.validate());
        errors.extend(self.api.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

fn strict(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProtocolError::ConfigError(format!(
            "Configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        )))
    }
}

fn validate_timeout(errors: &mut Vec<String>, name: &str, timeout: Duration) {
    if timeout.as_millis() < 100 {
        errors.push(format!("{name} timeout too short (minimum: 100ms)"));
    } else if timeout.as_secs() > 300 {
        errors.push(format!("{name} timeout too long (maximum: 300s)"));
    }
}

/// Sender (trapper) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Server addresses. Clusters are separated by `,`, nodes of one cluster by `;`
    /// (e.g. `"zbx1:10051;zbx2:10051,proxy:10051"`)
    pub server: String,

    /// Timeout for connect, send and receive
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// Maximum number of items per packet
    pub chunk_size: usize,

    /// Whether to compress outgoing packets
    pub compression: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            server: format!("127.0.0.1:{DEFAULT_SENDER_PORT}"),
            timeout: DEFAULT_SOCKET_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression: false,
        }
    }
}

impl SenderConfig {
    /// Parse `server` into clusters of failover nodes.
    pub fn clusters(&self) -> Result<Vec<Cluster>> {
        parse_clusters(&self.server)
    }

    /// Validate sender configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.server.trim().is_empty() {
            errors.push("Sender server address cannot be empty".to_string());
        } else if let Err(e) = self.clusters() {
            errors.push(e.to_string());
        }

        validate_timeout(&mut errors, "Sender", self.timeout);

        if self.chunk_size == 0 {
            errors.push("Chunk size must be greater than 0".to_string());
        }

        errors
    }
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// Getter (passive agent) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GetterConfig {
    /// Agent host name or address
    pub host: String,

    /// Agent port
    pub port: u16,

    /// Timeout for connect, send and receive
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for GetterConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: DEFAULT_AGENT_PORT,
            timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }
}

impl GetterConfig {
    /// Validate getter configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push("Getter host cannot be empty".to_string());
        }
        if self.port == 0 {
            errors.push("Getter port must be greater than 0".to_string());
        }
        validate_timeout(&mut errors, "Getter", self.timeout);

        errors
    }
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// JSON-RPC API client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API URL; `api_jsonrpc.php` and `http://` are added when missing
    pub url: String,

    /// User name for `user.login`
    #[serde(default)]
    pub user: Option<String>,

    /// Password for `user.login`
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Static API token; when set no login request is ever made
    #[serde(default)]
    pub token: Option<SecretString>,

    /// HTTP Basic authentication user
    #[serde(default)]
    pub http_user: Option<String>,

    /// HTTP Basic authentication password
    #[serde(default)]
    pub http_password: Option<SecretString>,

    /// HTTP request timeout
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// Whether to validate TLS certificates
    pub validate_certs: bool,

    /// Continue with API versions outside the supported range
    pub skip_version_check: bool,

    /// Assumed API version; when set, `apiinfo.version` detection is skipped
    #[serde(default)]
    pub version: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::from(DEFAULT_API_URL),
            user: None,
            password: None,
            token: None,
            http_user: None,
            http_password: None,
            timeout: DEFAULT_API_TIMEOUT,
            validate_certs: true,
            skip_version_check: false,
            version: None,
        }
    }
}

impl ApiConfig {
    /// Configuration for `url` with everything else defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Log in with user name and password on first authenticated call.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<SecretString>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Authenticate with a static API token.
    pub fn with_token(mut self, token: impl Into<SecretString>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add HTTP Basic authentication to every request.
    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<SecretString>) -> Self {
        self.http_user = Some(user.into());
        self.http_password = Some(password.into());
        self
    }

    /// Override URL and credentials from `ZABBIX_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("ZABBIX_URL") {
            self.url = url;
        }
        if let Ok(user) = std::env::var("ZABBIX_USER") {
            self.user = Some(user);
        }
        if let Ok(password) = std::env::var("ZABBIX_PASSWORD") {
            self.password = Some(SecretString::new(password));
        }
        if let Ok(token) = std::env::var("ZABBIX_TOKEN") {
            self.token = Some(SecretString::new(token));
        }
    }

    /// Normalized endpoint URL.
    pub fn endpoint(&self) -> String {
        normalize_api_url(&self.url)
    }

    /// Validate API configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.url.trim().is_empty() {
            errors.push("API URL cannot be empty".to_string());
        } else if let Err(e) = url::Url::parse(&self.endpoint()) {
            errors.push(format!("Invalid API URL '{}': {e}", self.url));
        }

        if self.user.is_some() != self.password.is_some() {
            errors.push("Both user and password must be specified for login".to_string());
        }

        if self.token.is_some() && self.user.is_some() {
            errors.push("Token cannot be used together with user and password".to_string());
        }

        if self.http_user.is_some() != self.http_password.is_some() {
            errors.push("Both http_user and http_password must be specified for Basic auth".to_string());
        }

        validate_timeout(&mut errors, "API", self.timeout);

        if let Some(ref version) = self.version {
            if version.parse::<crate::api::version::APIVersion>().is_err() {
                errors.push(format!("Invalid API version '{version}' (expected format: '7.0.0')"));
            }
        }

        errors
    }

    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// Main PHP file of the JSON-RPC API
pub const JSONRPC_FILE: &str = "api_jsonrpc.php";

/// Complete a partial API URL: append `api_jsonrpc.php` and default to `http://`.
pub fn normalize_api_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if !url.ends_with(JSONRPC_FILE) {
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(JSONRPC_FILE);
    }
    if !url.starts_with("http") {
        url = format!("http://{url}");
    }
    url
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level filter in `EnvFilter` syntax (e.g. `"info"`, `"zabbix_protocol=debug"`)
    pub level: String,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.level.trim().is_empty() {
            errors.push("Log level cannot be empty".to_string());
        }
        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_api_url() {
        assert_eq!(
            normalize_api_url("127.0.0.1"),
            "http://127.0.0.1/api_jsonrpc.php"
        );
        assert_eq!(
            normalize_api_url("https://zabbix.example.com/zabbix/"),
            "https://zabbix.example.com/zabbix/api_jsonrpc.php"
        );
        assert_eq!(
            normalize_api_url("http://localhost/zabbix/api_jsonrpc.php"),
            "http://localhost/zabbix/api_jsonrpc.php"
        );
    }

    #[test]
    fn test_secrets_not_in_debug() {
        let config = ApiConfig::new("localhost").with_credentials("Admin", "zabbix");
        let debug = format!("{config:?}");
        assert!(!debug.contains("zabbix\""));
        assert!(debug.contains("Admin"));
    }
}
