// crates/datakwip-clients/src/mcp.rs
// ============================================================================
// Module: MCP Client
// Description: JSON-RPC 2.0 tool-call client for the DataKwip MCP server.
// Purpose: Call `tools/list` and `tools/call` with strictly increasing ids.
// Dependencies: reqwest (via dispatch), serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`McpClient`] posts JSON-RPC envelopes to `<base>/mcp`. The request id
//! counter starts at 1 and is held locked for the whole round trip, so calls
//! from one instance complete in issuance order with no pipelining.
//! Invariants:
//! - Every request carries a fresh id greater than all previous ids.
//! - Id exhaustion is reported as a protocol violation, never wrapped.
//! - Bearer auth is attached only when a grant is configured.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::warn;

use crate::dispatch::Dispatcher;
use crate::dispatch::DispatcherSettings;
use crate::error::ClientError;
use crate::jsonrpc::RpcRequest;
use crate::jsonrpc::decode_rpc_response;
use crate::jsonrpc::unwrap_tool_result;
use crate::token::PasswordGrant;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC endpoint path.
pub const MCP_PATH: &str = "/mcp";
/// Tool that lists entities.
pub const QUERY_ENTITIES_TOOL: &str = "query_entities";
/// Tool that reads current point values.
pub const GET_CURRENT_VALUES_TOOL: &str = "get_current_values";

// ============================================================================
// SECTION: Types
// ============================================================================

/// MCP client configuration.
#[derive(Debug, Clone)]
pub struct McpClientConfig {
    /// MCP server base URL.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional credentials; requests are unauthenticated without them.
    pub grant: Option<PasswordGrant>,
    /// Whether TLS certificates are verified.
    pub verify_tls: bool,
}

impl McpClientConfig {
    /// Creates an unauthenticated configuration.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            grant: None,
            verify_tls: true,
        }
    }
}

/// Tool definition returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema for the tool arguments.
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

/// Arguments for the `query_entities` tool.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    /// Organization to query.
    pub org_id: i64,
    /// Maximum number of entities.
    pub limit: u32,
    /// Pagination offset.
    pub offset: u32,
    /// Optional field filters (for example `{"type": "AHU"}`).
    pub filters: Option<Map<String, Value>>,
}

impl Default for EntityQuery {
    fn default() -> Self {
        Self {
            org_id: 1,
            limit: 10,
            offset: 0,
            filters: None,
        }
    }
}

impl EntityQuery {
    /// Encodes the tool arguments; empty filters are omitted.
    #[must_use]
    pub fn arguments(&self) -> Value {
        let mut arguments = json!({
            "org_id": self.org_id,
            "limit": self.limit,
            "offset": self.offset,
        });
        if let Some(filters) = self.filters.as_ref().filter(|filters| !filters.is_empty())
            && let Some(object) = arguments.as_object_mut()
        {
            object.insert("filters".to_string(), Value::Object(filters.clone()));
        }
        arguments
    }
}

/// Extracts tool definitions from a `tools/list` result.
///
/// A missing or null `tools` member is an empty listing. Entries that do not
/// decode as a [`ToolDescriptor`] are skipped with a `warn` event.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] when `tools` is present but not an array.
pub fn decode_tool_listing(result: Option<&Value>) -> Result<Vec<ToolDescriptor>, ClientError> {
    let tools = match result.and_then(|result| result.get("tools")) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(tools)) => tools,
        Some(_) => {
            return Err(ClientError::Decode(
                "tools/list result: tools is not an array".to_string(),
            ));
        }
    };
    Ok(tools
        .iter()
        .enumerate()
        .filter_map(|(index, tool)| match ToolDescriptor::deserialize(tool) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                warn!(index, error = %err, "skipping undecodable tool definition");
                None
            }
        })
        .collect())
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking MCP JSON-RPC client.
///
/// # Invariants
/// - `next_id` is strictly increasing for each request sent by this client.
#[derive(Debug)]
pub struct McpClient {
    /// Request dispatcher.
    dispatcher: Dispatcher,
    /// Whether requests carry a bearer token.
    authenticated: bool,
    /// Next JSON-RPC request identifier; locked for the whole call.
    next_id: Mutex<u64>,
}

impl McpClient {
    /// Builds an MCP client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the base URL or HTTP client is invalid.
    pub fn new(config: McpClientConfig) -> Result<Self, ClientError> {
        let authenticated = config.grant.is_some();
        let mut settings = DispatcherSettings::new(config.base_url, config.timeout)
            .with_verify_tls(config.verify_tls);
        if let Some(grant) = config.grant {
            settings = settings.with_grant(grant);
        }
        Ok(Self {
            dispatcher: Dispatcher::new(settings)?,
            authenticated,
            next_id: Mutex::new(1),
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.dispatcher.base_url()
    }

    /// Overrides the next request id.
    #[cfg(test)]
    #[allow(dead_code, reason = "Test-only helper for request id overflow coverage.")]
    pub(crate) fn set_next_id_for_test(&self, next_id: u64) {
        *self.next_id.lock().unwrap_or_else(PoisonError::into_inner) = next_id;
    }

    /// Invokes a tool and returns its raw `result` payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] for a JSON-RPC error envelope and other
    /// [`ClientError`] variants for transport or envelope failures.
    pub fn call_tool(&self, name: &str, arguments: Value) -> Result<Option<Value>, ClientError> {
        self.send("tools/call", Some(json!({"name": name, "arguments": arguments})))
    }

    /// Lists the tools exposed by the server; a missing `tools` field is empty.
    ///
    /// Malformed tool entries are skipped rather than failing the listing.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, protocol, or decode failure.
    pub fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        let result = self.send("tools/list", None)?;
        decode_tool_listing(result.as_ref())
    }

    /// Runs `query_entities` and unwraps the tool result.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or protocol failure. Malformed tool
    /// content yields an empty list instead of an error.
    pub fn query_entities(&self, query: &EntityQuery) -> Result<Vec<Value>, ClientError> {
        let result = self.call_tool(QUERY_ENTITIES_TOOL, query.arguments())?;
        Ok(unwrap_tool_result(result.as_ref()))
    }

    /// Runs `get_current_values` for the given entities.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or protocol failure.
    pub fn get_current_values(
        &self,
        entity_ids: &[i64],
        org_id: i64,
    ) -> Result<Vec<Value>, ClientError> {
        let arguments = json!({"entity_ids": entity_ids, "org_id": org_id});
        let result = self.call_tool(GET_CURRENT_VALUES_TOOL, arguments)?;
        Ok(unwrap_tool_result(result.as_ref()))
    }

    /// Releases the client and its connection pool.
    pub fn close(self) {
        drop(self);
    }

    /// Sends one JSON-RPC request while holding the id counter.
    fn send(&self, method: &str, params: Option<Value>) -> Result<Option<Value>, ClientError> {
        let mut next_id = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *next_id;
        *next_id = next_id.checked_add(1).ok_or_else(|| {
            ClientError::ProtocolViolation("json-rpc request id overflow".to_string())
        })?;
        let envelope = serde_json::to_value(RpcRequest::new(id, method, params))
            .map_err(|err| ClientError::Decode(format!("request serialization failed: {err}")))?;
        debug!(id, method, "sending json-rpc request");
        let response = self.dispatcher.request(
            Method::POST,
            MCP_PATH,
            &[],
            Some(&envelope),
            self.authenticated,
        )?;
        decode_rpc_response(&response.body)
    }
}
