//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;
use zabbix_protocol::config::{ApiConfig, ClientConfig, GetterConfig, SenderConfig};
use zabbix_protocol::error::ProtocolError;

#[test]
fn test_default_config_validates() {
    let config = ClientConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_empty_sender_server() {
    let config = ClientConfig::default_with_overrides(|c| c.sender.server = String::new());
    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_invalid_sender_port() {
    let config = SenderConfig {
        server: "zabbix.example.com:port".into(),
        ..SenderConfig::default()
    };
    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Port must be an integer value")));
}

#[test]
fn test_sender_clusters() {
    let config = SenderConfig {
        server: "zbx1:10051;zbx2,proxy:10052".into(),
        ..SenderConfig::default()
    };
    assert!(config.validate().is_empty());
    let clusters = config.clusters().unwrap();
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].to_string(), "[zbx1:10051, zbx2:10051]");
    assert_eq!(clusters[1].to_string(), "[proxy:10052]");
}

#[test]
fn test_zero_chunk_size() {
    let config = SenderConfig {
        chunk_size: 0,
        ..SenderConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Chunk size must be greater than 0")));
}

#[test]
fn test_short_timeout() {
    let config = GetterConfig {
        timeout: Duration::from_millis(50),
        ..GetterConfig::default()
    };
    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("timeout too short")));
}

#[test]
fn test_long_timeout() {
    let config = ApiConfig {
        timeout: Duration::from_secs(600),
        ..ApiConfig::default()
    };
    assert!(config.validate().iter().any(|e| e.contains("timeout too long")));
}

#[test]
fn test_getter_zero_port() {
    let config = GetterConfig {
        port: 0,
        ..GetterConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("port must be greater than 0")));
}

#[test]
fn test_user_without_password() {
    let mut config = ApiConfig::new("localhost");
    config.user = Some("Admin".into());
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Both user and password")));
}

#[test]
fn test_token_with_credentials() {
    let config = ApiConfig::new("localhost")
        .with_credentials("Admin", "zabbix")
        .with_token("0424bd59b807674191e7d77572075f33");
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Token cannot be used together")));
}

#[test]
fn test_half_basic_auth() {
    let mut config = ApiConfig::new("localhost");
    config.http_user = Some("http_user".into());
    assert!(config.validate().iter().any(|e| e.contains("http_password")));
}

#[test]
fn test_invalid_assumed_version() {
    let mut config = ApiConfig::new("localhost");
    config.version = Some("seven".into());
    assert!(config.validate().iter().any(|e| e.contains("Invalid API version")));
}

#[test]
fn test_api_endpoint_normalized() {
    let config = ApiConfig::new("zabbix.example.com/zabbix");
    assert_eq!(
        config.endpoint(),
        "http://zabbix.example.com/zabbix/api_jsonrpc.php"
    );
}

#[test]
fn test_validate_strict_with_invalid_config() {
    let config = ClientConfig::default_with_overrides(|c| {
        c.sender.chunk_size = 0;
        c.getter.port = 0;
    });
    match config.validate_strict() {
        Err(ProtocolError::ConfigError(msg)) => {
            assert!(msg.contains("Configuration validation failed"));
            assert!(msg.contains("Chunk size"));
            assert!(msg.contains("Getter port"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_section_validate_strict() {
    assert!(SenderConfig::default().validate_strict().is_ok());
    assert!(GetterConfig::default().validate_strict().is_ok());

    let sender = SenderConfig {
        chunk_size: 0,
        ..SenderConfig::default()
    };
    assert!(matches!(
        sender.validate_strict(),
        Err(ProtocolError::ConfigError(msg)) if msg.contains("Chunk size")
    ));

    let getter = GetterConfig {
        host: String::new(),
        ..GetterConfig::default()
    };
    assert!(matches!(
        getter.validate_strict(),
        Err(ProtocolError::ConfigError(msg)) if msg.contains("Getter host")
    ));
}

#[test]
fn test_partial_toml() {
    let config = ClientConfig::from_toml(
        r#"
        [sender]
        server = "zbx1:10051;zbx2:10051"
        chunk_size = 100
        compression = true

        [api]
        url = "https://zabbix.example.com"
        token = "0424bd59b807674191e7d77572075f33"
        timeout = 5000
        "#,
    )
    .expect("partial TOML should parse");

    assert_eq!(config.sender.chunk_size, 100);
    assert!(config.sender.compression);
    assert_eq!(config.sender.timeout, Duration::from_secs(10));
    assert_eq!(config.getter.port, 10050);
    assert_eq!(config.api.timeout, Duration::from_secs(5));
    assert!(config.api.validate_certs);
    assert_eq!(
        config.api.token.as_ref().map(|t| t.expose()),
        Some("0424bd59b807674191e7d77572075f33")
    );
    assert!(config.validate().is_empty());
}

#[test]
fn test_invalid_toml() {
    assert!(matches!(
        ClientConfig::from_toml("[sender\nserver = 1"),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        ClientConfig::from_file("/nonexistent/zabbix.toml"),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
#[serial_test::serial]
fn test_from_env() {
    std::env::set_var("ZABBIX_URL", "https://monitoring.example.com");
    std::env::set_var("ZABBIX_TOKEN", "0424bd59b807674191e7d77572075f33");
    std::env::remove_var("ZABBIX_USER");
    std::env::remove_var("ZABBIX_PASSWORD");

    let config = ClientConfig::from_env().unwrap();
    assert_eq!(config.api.url, "https://monitoring.example.com");
    assert!(config.api.token.is_some());
    assert!(config.api.user.is_none());

    std::env::remove_var("ZABBIX_URL");
    std::env::remove_var("ZABBIX_TOKEN");
}

#[test]
#[serial_test::serial]
fn test_from_env_credentials() {
    std::env::set_var("ZABBIX_USER", "Admin");
    std::env::set_var("ZABBIX_PASSWORD", "zabbix");
    std::env::remove_var("ZABBIX_TOKEN");

    let config = ClientConfig::from_env().unwrap();
    assert_eq!(config.api.user.as_deref(), Some("Admin"));
    assert_eq!(config.api.password.as_ref().map(|p| p.expose()), Some("zabbix"));
    assert!(config.validate().is_empty());

    std::env::remove_var("ZABBIX_USER");
    std::env::remove_var("ZABBIX_PASSWORD");
}
