//! JSON-RPC 2.0 request and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, Result};

pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing request body.
///
/// `auth` is only present when the token travels in the body rather than in
/// the `Authorization` header.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Value,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<&'a str>,
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
            auth: None,
        }
    }
}

/// Error object of a failed call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: String,
}

/// Incoming response body.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcResponse {
    /// Split into the `result` value or an `ApiRequest` error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(RpcError {
                code,
                message,
                data,
            }) => Err(ProtocolError::ApiRequest {
                code,
                message,
                data,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_auth_omits_field() {
        let request = RpcRequest::new("apiinfo.version", json!({}), 1);
        let body = serde_json::to_string(&request).unwrap();
        assert_eq!(
            body,
            r#"{"jsonrpc":"2.0","method":"apiinfo.version","params":{},"id":1}"#
        );
    }

    #[test]
    fn test_request_with_body_auth() {
        let mut request = RpcRequest::new("host.get", json!({"output": "extend"}), 7);
        request.auth = Some("abc");
        let body: Value = serde_json::to_value(&request).unwrap();
        assert_eq!(body["auth"], "abc");
        assert_eq!(body["id"], 7);
    }

    #[test]
    fn test_error_response() {
        let response: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid params.","data":"Incorrect method."},"id":1}"#,
        )
        .unwrap();
        match response.into_result() {
            Err(ProtocolError::ApiRequest { code, data, .. }) => {
                assert_eq!(code, -32602);
                assert_eq!(data, "Incorrect method.");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_result_response() {
        let response: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":"7.0.0","id":1}"#).unwrap();
        assert_eq!(response.into_result().unwrap(), json!("7.0.0"));
    }
}
