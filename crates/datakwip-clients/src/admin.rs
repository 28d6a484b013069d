// crates/datakwip-clients/src/admin.rs
// ============================================================================
// Module: Realm Admin Client
// Description: Read-only identity-provider admin operations for one realm.
// Purpose: Inspect realm, client, and user registrations behind a connect gate.
// Dependencies: reqwest (via dispatch), serde, serde_json, tracing, url
// ============================================================================

//! ## Overview
//! [`RealmAdminClient`] is a two-state machine. It starts `Disconnected`;
//! [`RealmAdminClient::connect`] logs in through the `master` realm with the
//! `admin-cli` client and moves to `Connected`. [`RealmAdminClient::close`]
//! moves back. Every operation other than `connect` fails with
//! [`ClientError::NotConnected`] while disconnected.
//!
//! The `verify_*` helpers are pure projections of the matching lookup:
//! existence is a non-empty result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::info;
use url::Url;

use crate::dispatch::Dispatcher;
use crate::dispatch::DispatcherSettings;
use crate::dispatch::normalize_base_url;
use crate::error::ClientError;
use crate::token::PasswordGrant;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Realm used for admin login.
pub const ADMIN_LOGIN_REALM: &str = "master";
/// Public client used for admin login.
pub const ADMIN_CLIENT_ID: &str = "admin-cli";
/// Default page size for user listings.
pub const DEFAULT_USER_PAGE: u32 = 100;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Realm admin client configuration.
#[derive(Clone)]
pub struct AdminClientConfig {
    /// Identity provider base URL.
    pub server_url: String,
    /// Realm inspected after login.
    pub realm: String,
    /// Admin username in the `master` realm.
    pub admin_username: String,
    /// Admin password.
    pub admin_password: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Whether TLS certificates are verified.
    pub verify_tls: bool,
}

impl fmt::Debug for AdminClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminClientConfig")
            .field("server_url", &self.server_url)
            .field("realm", &self.realm)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

// ============================================================================
// SECTION: Representations
// ============================================================================

/// Realm summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmRepresentation {
    /// Realm name.
    pub realm: String,
    /// Whether the realm is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Client registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRepresentation {
    /// Internal identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// OAuth2 client identifier.
    pub client_id: String,
    /// Whether the client is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Whether the client is public (no secret).
    #[serde(default)]
    pub public_client: Option<bool>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    /// Internal identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the user is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRepresentation {
    /// Returns true when username or email contains `fragment`, ignoring case.
    #[must_use]
    pub fn matches(&self, fragment: &str) -> bool {
        let needle = fragment.to_lowercase();
        self.username.to_lowercase().contains(&needle)
            || self.email.as_deref().is_some_and(|email| email.to_lowercase().contains(&needle))
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Connection state of the admin client.
#[derive(Debug)]
enum AdminState {
    /// No admin session.
    Disconnected,
    /// Logged in; dispatcher targets `admin/realms/<realm>`.
    Connected(Dispatcher),
}

/// Read-only realm admin client.
#[derive(Debug)]
pub struct RealmAdminClient {
    /// Immutable configuration.
    config: AdminClientConfig,
    /// Normalized server URL.
    server_url: String,
    /// Current connection state.
    state: AdminState,
}

impl RealmAdminClient {
    /// Creates a disconnected client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the server URL is invalid.
    pub fn new(config: AdminClientConfig) -> Result<Self, ClientError> {
        let server_url = normalize_base_url(&config.server_url)?;
        Ok(Self {
            config,
            server_url,
            state: AdminState::Disconnected,
        })
    }

    /// Returns the configured realm name.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.config.realm
    }

    /// Returns true once `connect` has succeeded.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, AdminState::Connected(_))
    }

    /// Logs in through the `master` realm and targets the configured realm.
    ///
    /// The admin token is fetched eagerly so bad credentials fail here.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the URLs are invalid or the login fails.
    /// The client stays disconnected on failure.
    pub fn connect(&mut self) -> Result<(), ClientError> {
        let token_url = realm_url(
            &self.server_url,
            &["realms", ADMIN_LOGIN_REALM, "protocol", "openid-connect", "token"],
        )?;
        let admin_url =
            realm_url(&self.server_url, &["admin", "realms", self.config.realm.as_str()])?;
        let grant = PasswordGrant::new(
            token_url,
            ADMIN_CLIENT_ID,
            &self.config.admin_username,
            &self.config.admin_password,
        );
        let settings = DispatcherSettings::new(admin_url, self.config.timeout)
            .with_grant(grant)
            .with_verify_tls(self.config.verify_tls);
        let dispatcher = Dispatcher::new(settings)?;
        if let Some(tokens) = dispatcher.token_cache() {
            tokens.get_valid_token()?;
        }
        info!(realm = %self.config.realm, "realm admin connected");
        self.state = AdminState::Connected(dispatcher);
        Ok(())
    }

    /// Returns true when the realm lookup succeeds and names the configured realm.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when disconnected or the lookup fails.
    pub fn verify_connection(&self) -> Result<bool, ClientError> {
        Ok(self.get_realm_info()?.realm == self.config.realm)
    }

    /// Fetches the realm summary.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] before `connect`, else transport errors.
    pub fn get_realm_info(&self) -> Result<RealmRepresentation, ClientError> {
        self.session()?.get_json("", &[], true)
    }

    /// Lists every client registration in the realm.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] before `connect`, else transport errors.
    pub fn list_clients(&self) -> Result<Vec<ClientRepresentation>, ClientError> {
        self.session()?.get_json("/clients", &[], true)
    }

    /// Finds a client by its OAuth2 client identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] before `connect`, else transport errors.
    pub fn get_client_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ClientRepresentation>, ClientError> {
        Ok(self.list_clients()?.into_iter().find(|client| client.client_id == client_id))
    }

    /// Returns true when a client with this identifier exists.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] before `connect`, else transport errors.
    pub fn verify_client_exists(&self, client_id: &str) -> Result<bool, ClientError> {
        Ok(self.get_client_by_client_id(client_id)?.is_some())
    }

    /// Lists up to `max` users.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] before `connect`, else transport errors.
    pub fn list_users(&self, max: u32) -> Result<Vec<UserRepresentation>, ClientError> {
        self.session()?.get_json("/users", &[("max", max.to_string())], true)
    }

    /// Finds a user by exact username.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] before `connect`, else transport errors.
    pub fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRepresentation>, ClientError> {
        let query = [("username", username.to_string()), ("exact", "true".to_string())];
        let users: Vec<UserRepresentation> = self.session()?.get_json("/users", &query, true)?;
        Ok(users.into_iter().next())
    }

    /// Returns true when a user with this exact username exists.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] before `connect`, else transport errors.
    pub fn verify_user_exists(&self, username: &str) -> Result<bool, ClientError> {
        Ok(self.get_user_by_username(username)?.is_some())
    }

    /// Lists users whose username or email contains `fragment`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] before `connect`, else transport errors.
    pub fn find_users_matching(
        &self,
        fragment: &str,
        max: u32,
    ) -> Result<Vec<UserRepresentation>, ClientError> {
        let mut users = self.list_users(max)?;
        users.retain(|user| user.matches(fragment));
        Ok(users)
    }

    /// Drops the admin session.
    pub fn close(&mut self) {
        self.state = AdminState::Disconnected;
    }

    /// Returns the connected dispatcher or the precondition error.
    fn session(&self) -> Result<&Dispatcher, ClientError> {
        match &self.state {
            AdminState::Connected(dispatcher) => Ok(dispatcher),
            AdminState::Disconnected => Err(ClientError::NotConnected),
        }
    }
}

/// Appends percent-encoded path segments to the server URL.
fn realm_url(server_url: &str, segments: &[&str]) -> Result<String, ClientError> {
    let mut url = Url::parse(server_url)
        .map_err(|err| ClientError::Config(format!("invalid server url {server_url}: {err}")))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::Config(format!("server url cannot be a base: {server_url}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}
