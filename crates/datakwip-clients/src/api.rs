// crates/datakwip-clients/src/api.rs
// ============================================================================
// Module: REST API Client
// Description: Typed client for the DataKwip REST API.
// Purpose: Expose database health and entity/tag listing over bearer auth.
// Dependencies: serde, serde_json, reqwest (via dispatch)
// ============================================================================

//! ## Overview
//! [`ApiClient`] composes one [`Dispatcher`] configured with a password grant
//! carrying [`API_SCOPE`]. Health is public; entity and tag listings require
//! a bearer token. All operations are read-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::dispatch::DispatcherSettings;
use crate::error::ClientError;
use crate::token::PasswordGrant;
use crate::token::TokenCache;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scope requested for API tokens.
pub const API_SCOPE: &str = "openid profile email datakwip:entity:list datakwip:entity:tag:list";
/// Status string reported by a healthy database.
pub const HEALTHY_STATUS: &str = "healthy";

/// Database health endpoint.
const HEALTH_PATH: &str = "/health/databases";
/// Entity listing endpoint.
const ENTITY_PATH: &str = "/entity";
/// Entity tag listing endpoint.
const ENTITY_TAG_PATH: &str = "/entitytag";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// API client configuration.
///
/// # Invariants
/// - Immutable once handed to [`ApiClient::new`].
#[derive(Clone)]
pub struct ApiClientConfig {
    /// API base URL.
    pub base_url: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
    /// OAuth2 client identifier.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Resource owner username (email).
    pub username: String,
    /// Resource owner password.
    pub password: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Whether TLS certificates are verified.
    pub verify_tls: bool,
}

impl ApiClientConfig {
    /// Builds the password grant used by the API client.
    #[must_use]
    pub fn grant(&self) -> PasswordGrant {
        PasswordGrant::new(&self.token_url, &self.client_id, &self.username, &self.password)
            .with_client_secret(&self.client_secret)
            .with_scope(API_SCOPE)
    }
}

impl fmt::Debug for ApiClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientConfig")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

// ============================================================================
// SECTION: Response Types
// ============================================================================

/// Entity row returned by `GET /entity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity identifier.
    pub id: i64,
    /// Owning organization.
    pub org_id: i64,
    /// Entity key.
    #[serde(default)]
    pub key: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entity tag row returned by `GET /entitytag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTag {
    /// Tag identifier.
    #[serde(default)]
    pub id: Option<i64>,
    /// Tagged entity.
    pub entity_id: i64,
    /// Tag key.
    #[serde(default)]
    pub tag_key: Option<String>,
    /// Tag value (any JSON scalar).
    #[serde(default)]
    pub tag_value: Option<Value>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Status of one database in the health report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseStatus {
    /// Reported status string.
    #[serde(default)]
    pub status: Option<String>,
    /// Reported probe latency.
    #[serde(default)]
    pub latency_ms: Option<f64>,
}

/// Database health report keyed by database name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DatabaseHealth {
    /// Raw per-database entries.
    databases: BTreeMap<String, Value>,
}

impl DatabaseHealth {
    /// Returns the reported database names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    /// Returns true when no databases are reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Returns the raw entry for a database.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.databases.get(name)
    }

    /// Returns the decoded status for a database, if it is an object.
    #[must_use]
    pub fn database(&self, name: &str) -> Option<DatabaseStatus> {
        self.databases.get(name).and_then(|entry| DatabaseStatus::deserialize(entry).ok())
    }

    /// Returns true when the database reports `status == "healthy"`.
    #[must_use]
    pub fn is_healthy(&self, name: &str) -> bool {
        self.database(name).and_then(|db| db.status).is_some_and(|status| status == HEALTHY_STATUS)
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking DataKwip REST API client.
#[derive(Debug)]
pub struct ApiClient {
    /// Request dispatcher with the API grant attached.
    dispatcher: Dispatcher,
}

impl ApiClient {
    /// Builds an API client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the base URL or HTTP client is invalid.
    pub fn new(config: &ApiClientConfig) -> Result<Self, ClientError> {
        let settings = DispatcherSettings::new(&config.base_url, config.timeout)
            .with_grant(config.grant())
            .with_verify_tls(config.verify_tls);
        Ok(Self {
            dispatcher: Dispatcher::new(settings)?,
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.dispatcher.base_url()
    }

    /// Returns the token cache backing authenticated calls.
    #[must_use]
    pub const fn token_cache(&self) -> Option<&TokenCache> {
        self.dispatcher.token_cache()
    }

    /// Fetches `GET /health/databases` without authentication.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or decode failure.
    pub fn get_database_health(&self) -> Result<DatabaseHealth, ClientError> {
        self.dispatcher.get_json(HEALTH_PATH, &[], false)
    }

    /// Lists entities for an organization.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on token, transport, or decode failure.
    pub fn list_entities(&self, org_id: i64, limit: u32) -> Result<Vec<Entity>, ClientError> {
        self.dispatcher.get_json(ENTITY_PATH, &org_query(org_id, limit), true)
    }

    /// Lists entity tags for an organization.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on token, transport, or decode failure.
    pub fn list_entity_tags(&self, org_id: i64, limit: u32) -> Result<Vec<EntityTag>, ClientError> {
        self.dispatcher.get_json(ENTITY_TAG_PATH, &org_query(org_id, limit), true)
    }

    /// Releases the client and its connection pool.
    pub fn close(self) {
        drop(self);
    }
}

/// Builds the `org_id`/`limit` query pairs.
fn org_query(org_id: i64, limit: u32) -> [(&'static str, String); 2] {
    [("org_id", org_id.to_string()), ("limit", limit.to_string())]
}
