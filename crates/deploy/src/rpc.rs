//! Shared utilities for talking to Ethereum JSON-RPC endpoints.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::LedgerError;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, LedgerError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|err| LedgerError::Transport(format!("failed to create HTTP client: {err}")))
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// A `null` result deserializes into `T` like any other value, so callers polling for
/// something that may not exist yet should ask for an `Option`.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, LedgerError> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(|err| LedgerError::Transport(format!("failed to send {method} request: {err}")))?;

    let result: Value = response
        .json()
        .await
        .map_err(|err| LedgerError::Transport(format!("failed to parse {method} response: {err}")))?;

    if let Some(error) = result.get("error") {
        return Err(LedgerError::Rpc {
            method: method.to_string(),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result_value = result.get("result").cloned().unwrap_or(Value::Null);

    serde_json::from_value(result_value).map_err(|err| LedgerError::Rpc {
        method: method.to_string(),
        message: format!("unexpected result: {err}"),
    })
}
