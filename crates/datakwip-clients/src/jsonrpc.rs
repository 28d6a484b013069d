// crates/datakwip-clients/src/jsonrpc.rs
// ============================================================================
// Module: JSON-RPC Envelopes
// Description: Request envelope, response decoding, and tool-result unwrapping.
// Purpose: Isolate the narrow JSON-RPC 2.0 subset spoken by the MCP server.
// Dependencies: serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Two decoders live here. [`decode_rpc_response`] classifies a response body
//! into a result payload, a [`RpcError`], or a protocol violation.
//! [`unwrap_tool_result`] turns a `tools/call` result into a list of items.
//!
//! Tool-result unwrapping is deliberately lenient: the content envelope shape
//! is not contractually fixed upstream, so ambiguous payloads degrade to an
//! empty list instead of an error. Malformed content text is logged at `warn`.
//! Invariants:
//! - An `error` member that is present and non-null always wins over `result`.
//! - A response with neither `result` nor `error` is a protocol violation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::error::ClientError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC protocol version tag.
pub const JSONRPC_VERSION: &str = "2.0";
/// Error code reported when the server omits one.
pub const DEFAULT_ERROR_CODE: i64 = -1;
/// Error message reported when the server omits one.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";
/// Content text assumed when the first content item has no `text`.
const DEFAULT_CONTENT_TEXT: &str = "[]";

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// JSON-RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest<'a> {
    /// Protocol version tag.
    pub jsonrpc: &'static str,
    /// Request identifier, unique per client instance.
    pub id: u64,
    /// Method name.
    pub method: &'a str,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> RpcRequest<'a> {
    /// Builds a request envelope.
    #[must_use]
    pub const fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC error object returned by the server.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("json-rpc error {code}: {message}")]
pub struct RpcError {
    /// Error code.
    #[serde(default = "default_error_code")]
    pub code: i64,
    /// Error message.
    #[serde(default = "default_error_message")]
    pub message: String,
    /// Optional structured error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Builds an error from the raw `error` member, tolerating missing fields.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let code = value.get("code").and_then(Value::as_i64).unwrap_or(DEFAULT_ERROR_CODE);
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ERROR_MESSAGE)
            .to_string();
        let data = value.get("data").filter(|data| !data.is_null()).cloned();
        Self {
            code,
            message,
            data,
        }
    }
}

/// Serde default for [`RpcError::code`].
const fn default_error_code() -> i64 {
    DEFAULT_ERROR_CODE
}

/// Serde default for [`RpcError::message`].
fn default_error_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}

// ============================================================================
// SECTION: Response Decoding
// ============================================================================

/// Decodes a JSON-RPC response body.
///
/// Returns `Ok(None)` when `result` is present but null.
///
/// # Errors
///
/// - [`ClientError::Decode`] when the body is not JSON.
/// - [`ClientError::Protocol`] when the body carries a non-null `error`.
/// - [`ClientError::ProtocolViolation`] when the body is not an object or has
///   neither `result` nor `error`.
pub fn decode_rpc_response(body: &[u8]) -> Result<Option<Value>, ClientError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| ClientError::Decode(format!("invalid json-rpc response: {err}")))?;
    let Value::Object(mut envelope) = value else {
        return Err(ClientError::ProtocolViolation("response is not a json object".to_string()));
    };
    classify_envelope(&mut envelope)
}

/// Splits an envelope object into its result or error branch.
fn classify_envelope(envelope: &mut Map<String, Value>) -> Result<Option<Value>, ClientError> {
    if let Some(error) = envelope.get("error").filter(|error| !error.is_null()) {
        return Err(ClientError::Protocol(RpcError::from_value(error)));
    }
    match envelope.remove("result") {
        Some(Value::Null) => Ok(None),
        Some(result) => Ok(Some(result)),
        None => Err(ClientError::ProtocolViolation(
            "response has neither result nor error".to_string(),
        )),
    }
}

// ============================================================================
// SECTION: Tool Results
// ============================================================================

/// Unwraps a `tools/call` result into a list of items.
///
/// 1. `{content: [{text: "<json>"}, ..]}` parses the first item's text. An
///    array yields its items; any other JSON value yields a one-item list.
/// 2. A bare JSON array is returned as-is.
/// 3. Anything else yields an empty list.
#[must_use]
pub fn unwrap_tool_result(result: Option<&Value>) -> Vec<Value> {
    match result {
        Some(Value::Object(object)) => match object.get("content") {
            Some(Value::Array(content)) => {
                content.first().map_or_else(Vec::new, parse_content_text)
            }
            _ => Vec::new(),
        },
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Parses the `text` member of one content item as JSON.
fn parse_content_text(item: &Value) -> Vec<Value> {
    let text = item.get("text").and_then(Value::as_str).unwrap_or(DEFAULT_CONTENT_TEXT);
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => Vec::new(),
        Ok(other) => vec![other],
        Err(err) => {
            warn!(error = %err, "tool result text is not valid json");
            Vec::new()
        }
    }
}
