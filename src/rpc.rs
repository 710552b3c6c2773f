//! JSON-RPC client shared by the node and gateway executors

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object. Gateways are loose about its shape, so every field is optional.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Errors from a JSON-RPC round trip
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Empty response to {0}")]
    Empty(String),
}

/// JSON-RPC client over HTTP POST
pub struct RpcClient {
    url: String,
    client: Client,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create new RPC client with a per-request timeout
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            request_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get next request ID
    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make a JSON-RPC call that must return a result
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| RpcError::Empty(method.to_string()))
    }

    /// Make a JSON-RPC call where a missing or null result is acceptable.
    ///
    /// Succeeds iff the HTTP status is 200 and the body carries no `error`.
    pub async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };

        debug!("→ {} {}", self.url, method);

        let response = self.client.post(&self.url).json(&request).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(RpcError::Http(response.status()));
        }

        let body = response.bytes().await?;
        let json_response: JsonRpcResponse<T> =
            serde_json::from_slice(&body).map_err(|e| RpcError::Parse(e.to_string()))?;

        if let Some(error) = json_response.error {
            return Err(RpcError::Rpc {
                code: error.code.unwrap_or(0),
                message: error.message.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(json_response.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRpc;
    use serde_json::json;

    #[test]
    fn test_request_id_increment() {
        let client = RpcClient::new("http://localhost", Duration::from_secs(1)).unwrap();
        assert_eq!(client.next_id(), 1);
        assert_eq!(client.next_id(), 2);
        assert_eq!(client.next_id(), 3);
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let mock = MockRpc::start(|method, _| match method {
            "echo" => json!({"jsonrpc": "2.0", "result": 42, "id": 1}),
            _ => json!({"jsonrpc": "2.0", "error": {"code": -32601, "message": "nope"}, "id": 1}),
        })
        .await;

        let client = RpcClient::new(&mock.url(), Duration::from_secs(5)).unwrap();
        let value: u64 = client.call("echo", json!([])).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(mock.methods(), vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn test_error_field_is_an_error() {
        let mock = MockRpc::start(|_, _| {
            json!({"jsonrpc": "2.0", "error": {"code": -32601, "message": "nope"}, "id": 1})
        })
        .await;

        let client = RpcClient::new(&mock.url(), Duration::from_secs(5)).unwrap();
        let err = client.call::<u64>("missing", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::Rpc { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_null_result_is_empty() {
        let mock = MockRpc::start(|_, _| json!({"jsonrpc": "2.0", "result": null, "id": 1})).await;

        let client = RpcClient::new(&mock.url(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.call::<u64>("x", json!([])).await,
            Err(RpcError::Empty(_))
        ));
        let optional: Option<u64> = client.call_optional("x", json!([])).await.unwrap();
        assert!(optional.is_none());
    }

    #[tokio::test]
    async fn test_non_200_is_http_error() {
        let mock = MockRpc::start_with_status(502, |_, _| json!({})).await;

        let client = RpcClient::new(&mock.url(), Duration::from_secs(5)).unwrap();
        let err = client.call::<u64>("x", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::Http(s) if s == reqwest::StatusCode::BAD_GATEWAY));
    }
}
