// crates/datakwip-clients/src/error.rs
// ============================================================================
// Module: Client Errors
// Description: Error taxonomy shared by the API, MCP, and realm admin clients.
// Purpose: Surface transport, protocol, and precondition failures as values.
// Dependencies: thiserror, reqwest
// ============================================================================

//! ## Overview
//! Every client operation returns [`ClientError`] on failure. The core never
//! retries and never swallows a transport or protocol error; the only lenient
//! boundary is tool-result unwrapping in [`crate::jsonrpc`].
//! Invariants:
//! - `Transport` is produced only for responses with a non-2xx status.
//! - `Protocol` carries the server's JSON-RPC error object unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::jsonrpc::RpcError;

// ============================================================================
// SECTION: Client Errors
// ============================================================================

/// Errors emitted by the DataKwip clients.
///
/// # Invariants
/// - Variants are stable for programmatic handling by test suites.
/// - String payloads may include untrusted server text.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client configuration is invalid (URL, header value, TLS setup).
    #[error("client config error: {0}")]
    Config(String),
    /// The request never produced an HTTP response (connect failure, timeout).
    #[error("http request failed: {0}")]
    Http(String),
    /// The server answered with a non-2xx status.
    #[error("http status {status}: {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Response body preview.
        body: String,
    },
    /// Response body could not be decoded into the expected shape.
    #[error("response decode error: {0}")]
    Decode(String),
    /// JSON-RPC error envelope returned by the server.
    #[error(transparent)]
    Protocol(#[from] RpcError),
    /// JSON-RPC response violated the envelope contract.
    #[error("json-rpc protocol violation: {0}")]
    ProtocolViolation(String),
    /// Admin operation invoked before `connect()`.
    #[error("not connected; call connect() first")]
    NotConnected,
}

impl ClientError {
    /// Returns the HTTP status for transport errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport {
                status, ..
            } => Some(*status),
            _ => None,
        }
    }

    /// Returns the JSON-RPC error for protocol errors.
    #[must_use]
    pub const fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Self::Protocol(error) => Some(error),
            _ => None,
        }
    }

    /// Maps a reqwest send failure onto the client taxonomy.
    pub(crate) fn from_send(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::Config(err.to_string());
        }
        Self::Http(err.to_string())
    }
}
