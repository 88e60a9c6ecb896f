//! Trapper and agent responses.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::protocol::cluster::Node;

const INFO_PATTERN: &str = r"[Pp]rocessed:\s*(\d+);\s*[Ff]ailed:\s*(\d+);\s*[Tt]otal:\s*(\d+);\s*[Ss]econds spent:\s*(\d+(?:\.\d+)?)";

static INFO_REGEX: OnceLock<Regex> = OnceLock::new();

fn info_regex() -> &'static Regex {
    INFO_REGEX.get_or_init(|| Regex::new(INFO_PATTERN).expect("valid regex pattern"))
}

/// Marker an agent returns for keys it cannot evaluate.
pub const NOT_SUPPORTED: &str = "ZBX_NOTSUPPORTED";
const NOT_SUPPORTED_DEFAULT: &str = "Not supported by Zabbix Agent";

/// Counters reported by one node for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapperResult {
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
    pub time: Duration,
    /// 1-based chunk number.
    pub chunk: usize,
}

impl TrapperResult {
    /// Parse a trapper reply such as
    /// `{"response":"success","info":"processed: 1; failed: 0; total: 1; seconds spent: 0.000057"}`.
    ///
    /// # Errors
    /// `UnexpectedResponse` if the reply is not JSON, `response` is not
    /// `success`, or `info` is missing or malformed.
    pub fn parse(reply: &str, chunk: usize) -> Result<Self> {
        let unexpected = || {
            debug!("Received unexpected response: {reply}");
            ProtocolError::UnexpectedResponse(reply.to_string())
        };

        let body: Value = serde_json::from_str(reply).map_err(|_| unexpected())?;
        if body.get("response").and_then(Value::as_str) != Some("success") {
            return Err(unexpected());
        }
        let info = body
            .get("info")
            .and_then(Value::as_str)
            .filter(|info| !info.is_empty())
            .ok_or_else(unexpected)?;
        let caps = info_regex().captures(info).ok_or_else(unexpected)?;

        let count = |idx: usize| -> Result<u64> {
            caps.get(idx)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(unexpected)
        };
        let seconds: f64 = caps
            .get(4)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(unexpected)?;
        let time = Duration::try_from_secs_f64(seconds).map_err(|_| unexpected())?;

        Ok(Self {
            processed: count(1)?,
            failed: count(2)?,
            total: count(3)?,
            time,
            chunk,
        })
    }
}

/// Result of one node for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeResult {
    pub node: Node,
    pub result: TrapperResult,
}

/// Aggregated outcome of a send.
///
/// Counters are summed over every chunk and every cluster that received it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SenderResponse {
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
    pub time: Duration,
    /// Number of chunks sent.
    pub chunk: usize,
    pub details: Vec<NodeResult>,
}

impl SenderResponse {
    pub fn add(&mut self, node: Node, result: TrapperResult) {
        self.processed += result.processed;
        self.failed += result.failed;
        self.total += result.total;
        self.time += result.time;
        self.chunk = self.chunk.max(result.chunk);
        self.details.push(NodeResult { node, result });
    }

    /// True when no value was rejected.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Reply of a passive agent to a `get` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResponse {
    pub raw: String,
    pub value: Option<String>,
    pub error: Option<String>,
}

impl AgentResponse {
    /// Interpret the text an agent sent back.
    ///
    /// `ZBX_NOTSUPPORTED\0<message>` becomes an error carrying `<message>`;
    /// anything else is the value.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if let Some(rest) = raw.strip_prefix(NOT_SUPPORTED) {
            let message = rest
                .strip_prefix('\0')
                .filter(|message| !message.is_empty())
                .unwrap_or(NOT_SUPPORTED_DEFAULT);
            return Self {
                error: Some(message.to_string()),
                value: None,
                raw,
            };
        }
        Self {
            value: Some(raw.clone()),
            error: None,
            raw,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const REPLY: &str = r#"{"response":"success","info":"processed: 9; failed: 1; total: 10; seconds spent: 0.000057"}"#;

    #[test]
    fn test_parse_trapper_reply() {
        let result = TrapperResult::parse(REPLY, 1).unwrap();
        assert_eq!(result.processed, 9);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total, 10);
        assert!((result.time.as_secs_f64() - 0.000057).abs() < 1e-9);
        assert_eq!(result.chunk, 1);
    }

    #[test]
    fn test_parse_capitalised_info() {
        let reply = r#"{"response":"success","info":"Processed: 1; Failed: 0; Total: 1; Seconds spent: 0.1"}"#;
        let result = TrapperResult::parse(reply, 2).unwrap();
        assert_eq!(result.processed, 1);
        assert!((result.time.as_secs_f64() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_unexpected_replies() {
        for reply in [
            r#"{"response":"success"}"#,
            r#"{"response":"success","info":""}"#,
            r#"{"response":"failed","info":"processed: 1; failed: 0; total: 1; seconds spent: 0.1"}"#,
            r#"{"response":"success","info":"garbage"}"#,
            "not json",
            r#"{"response":"success","info":"processed: 1; failed: 0; total: 1; seconds spent: 99999999999999999999999.5"}"#,
        ] {
            assert!(
                matches!(
                    TrapperResult::parse(reply, 1),
                    Err(ProtocolError::UnexpectedResponse(_))
                ),
                "{reply}"
            );
        }
    }

    #[test]
    fn test_sender_response_sums_nodes() {
        let mut response = SenderResponse::default();
        let first = TrapperResult::parse(REPLY, 1).unwrap();
        let second = TrapperResult::parse(REPLY, 2).unwrap();
        response.add(Node::new("a", 10051), first);
        response.add(Node::new("b", 10051), second);

        assert_eq!(response.processed, 18);
        assert_eq!(response.failed, 2);
        assert_eq!(response.total, 20);
        assert_eq!(response.chunk, 2);
        assert_eq!(response.details.len(), 2);
        assert!(!response.is_success());
    }

    #[test]
    fn test_agent_response() {
        let ok = AgentResponse::parse("Linux test_server 5.15.0-3.60.5.1.el9uek.x86_64");
        assert_eq!(
            ok.value.as_deref(),
            Some("Linux test_server 5.15.0-3.60.5.1.el9uek.x86_64")
        );
        assert!(ok.is_supported());

        let unsupported = AgentResponse::parse("ZBX_NOTSUPPORTED\0Unsupported item key.");
        assert_eq!(unsupported.value, None);
        assert_eq!(unsupported.error.as_deref(), Some("Unsupported item key."));

        let bare = AgentResponse::parse("ZBX_NOTSUPPORTED");
        assert_eq!(bare.error.as_deref(), Some("Not supported by Zabbix Agent"));
        assert_eq!(bare.raw, "ZBX_NOTSUPPORTED");
    }
}
