//! Values pushed to the trapper.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `request` field of a sender packet.
pub const SENDER_REQUEST: &str = "sender data";

/// One value for an item of a host.
///
/// `clock` is a Unix timestamp and `ns` its nanosecond part; both are omitted
/// from the packet when unset and the server assigns its receive time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemValue {
    pub host: String,
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns: Option<i64>,
}

impl ItemValue {
    pub fn new(host: impl Into<String>, key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            host: host.into(),
            key: key.into(),
            value: value.to_string(),
            clock: None,
            ns: None,
        }
    }

    pub fn with_clock(mut self, clock: i64) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_ns(mut self, ns: i64) -> Self {
        self.ns = Some(ns);
        self
    }
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Build the `sender data` request body for `items`.
pub fn sender_request(items: &[ItemValue]) -> Value {
    json!({
        "request": SENDER_REQUEST,
        "data": items,
    })
}
