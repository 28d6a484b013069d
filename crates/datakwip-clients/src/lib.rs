// crates/datakwip-clients/src/lib.rs
// ============================================================================
// Module: DataKwip Clients Library
// Description: Authenticated clients for the DataKwip platform surfaces.
// Purpose: Share token caching, dispatch, and envelope decoding across clients.
// Dependencies: reqwest, serde, serde_json, thiserror, time, tracing, url
// ============================================================================

//! ## Overview
//! Blocking clients for the four DataKwip surfaces: the REST API
//! ([`ApiClient`]), the MCP tool server ([`McpClient`]), the identity-provider
//! admin API ([`RealmAdminClient`]), and the web UI ([`UiClient`]).
//!
//! The three HTTP clients share one core: a per-instance [`TokenCache`], the
//! retry-free [`Dispatcher`], and the JSON-RPC decoders in [`jsonrpc`].
//! Invariants:
//! - Each client owns its configuration and token; nothing is process-global.
//! - Every failure is returned as a value; nothing in the core panics or retries.
//! - Clients are synchronous; one call is in flight per instance at a time.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod admin;
pub mod api;
pub mod browser;
pub mod dispatch;
pub mod error;
pub mod jsonrpc;
pub mod mcp;
pub mod token;
pub mod ui;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use admin::AdminClientConfig;
pub use admin::ClientRepresentation;
pub use admin::RealmAdminClient;
pub use admin::RealmRepresentation;
pub use admin::UserRepresentation;
pub use api::ApiClient;
pub use api::ApiClientConfig;
pub use api::DatabaseHealth;
pub use api::DatabaseStatus;
pub use api::Entity;
pub use api::EntityTag;
pub use browser::PlaywrightCliDriver;
pub use dispatch::DispatchResponse;
pub use dispatch::Dispatcher;
pub use dispatch::DispatcherSettings;
pub use dispatch::MAX_RESPONSE_BYTES;
pub use error::ClientError;
pub use jsonrpc::RpcError;
pub use jsonrpc::unwrap_tool_result;
pub use mcp::EntityQuery;
pub use mcp::McpClient;
pub use mcp::McpClientConfig;
pub use mcp::ToolDescriptor;
pub use token::CachedToken;
pub use token::Clock;
pub use token::PasswordGrant;
pub use token::SystemClock;
pub use token::TokenCache;
pub use ui::BrowserDriver;
pub use ui::BrowserType;
pub use ui::LaunchOptions;
pub use ui::LoadState;
pub use ui::QueryOutcome;
pub use ui::UiClient;
pub use ui::UiClientConfig;
pub use ui::UiError;
