// crates/datakwip-clients/src/token.rs
// ============================================================================
// Module: Token Cache
// Description: OAuth2 password-grant token acquisition with expiry-aware reuse.
// Purpose: Hand out a valid bearer token, fetching a new one only when needed.
// Dependencies: reqwest, serde, time, tracing, url
// ============================================================================

//! ## Overview
//! [`TokenCache`] holds at most one [`CachedToken`] per client instance. A
//! token is reused until `now >= expires_at - 30s`, after which the next
//! caller performs exactly one password-grant fetch while holding the cache
//! lock, so concurrent callers sharing a cache never race duplicate fetches.
//! Invariants:
//! - `expires_at` is always `issued_at + expires_in`.
//! - A failed fetch leaves the cache empty; the next call fetches again.
//! - Tokens are replaced, never mutated in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use time::Duration;
use time::OffsetDateTime;
use tracing::debug;
use tracing::info;

use crate::dispatch::read_checked_body;
use crate::error::ClientError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Safety margin subtracted from the expiry before a token is considered unusable.
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::seconds(30);
/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 300;
/// Token type assumed when the token endpoint omits `token_type`.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of wall-clock time for expiry decisions.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

// ============================================================================
// SECTION: Token Types
// ============================================================================

/// Decoded OAuth2 token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Opaque bearer credential.
    pub access_token: String,
    /// Lifetime in seconds, when provided.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Token type, when provided.
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Decodes a token endpoint response body.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] when the body is not JSON or lacks `access_token`.
pub fn decode_token_response(body: &[u8]) -> Result<TokenResponse, ClientError> {
    serde_json::from_slice(body)
        .map_err(|err| ClientError::Decode(format!("invalid token response: {err}")))
}

/// Bearer token plus its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    /// Opaque bearer credential.
    access_token: String,
    /// Absolute expiry instant.
    expires_at: OffsetDateTime,
    /// Token type reported by the issuer.
    token_type: String,
}

impl CachedToken {
    /// Builds a cached token from a decoded response issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when `expires_in` overflows the calendar.
    pub fn issue(response: TokenResponse, issued_at: OffsetDateTime) -> Result<Self, ClientError> {
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = issued_at.checked_add(Duration::seconds(expires_in)).ok_or_else(|| {
            ClientError::Decode(format!("expires_in out of range: {expires_in}"))
        })?;
        Ok(Self {
            access_token: response.access_token,
            expires_at,
            token_type: response.token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        })
    }

    /// Returns the bearer credential.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the absolute expiry instant.
    #[must_use]
    pub const fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Returns the token type.
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Returns true once `now` is within the safety margin of the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.checked_sub(EXPIRY_SAFETY_MARGIN).is_none_or(|deadline| now >= deadline)
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

// ============================================================================
// SECTION: Password Grant
// ============================================================================

/// Credentials for an OAuth2 resource-owner password grant.
#[derive(Clone)]
pub struct PasswordGrant {
    /// Token endpoint URL.
    token_url: String,
    /// OAuth2 client identifier.
    client_id: String,
    /// Optional confidential-client secret.
    client_secret: Option<String>,
    /// Resource owner username.
    username: String,
    /// Resource owner password.
    password: String,
    /// Optional space-separated scope string.
    scope: Option<String>,
}

impl PasswordGrant {
    /// Creates a grant for a public client without scope.
    #[must_use]
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: None,
            username: username.into(),
            password: password.into(),
            scope: None,
        }
    }

    /// Attaches a confidential-client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Attaches a scope string.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Returns the token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Returns the client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Form-encodes the grant request body.
    fn form_body(&self) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("grant_type", "password");
        form.append_pair("client_id", &self.client_id);
        if let Some(secret) = &self.client_secret {
            form.append_pair("client_secret", secret);
        }
        form.append_pair("username", &self.username);
        form.append_pair("password", &self.password);
        if let Some(scope) = &self.scope {
            form.append_pair("scope", scope);
        }
        form.finish()
    }
}

impl fmt::Debug for PasswordGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordGrant")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

// ============================================================================
// SECTION: Token Cache
// ============================================================================

/// Single-slot bearer token cache owned by one client instance.
pub struct TokenCache {
    /// HTTP client used for token endpoint calls.
    client: Client,
    /// Grant credentials.
    grant: PasswordGrant,
    /// Clock used for issue and expiry decisions.
    clock: Arc<dyn Clock>,
    /// Currently held token, if any.
    slot: Mutex<Option<CachedToken>>,
    /// Number of token endpoint requests issued.
    fetches: AtomicU64,
}

impl TokenCache {
    /// Creates an empty cache using the system clock.
    #[must_use]
    pub fn new(client: Client, grant: PasswordGrant) -> Self {
        Self::with_clock(client, grant, Arc::new(SystemClock))
    }

    /// Creates an empty cache with an explicit clock.
    #[must_use]
    pub fn with_clock(client: Client, grant: PasswordGrant, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            grant,
            clock,
            slot: Mutex::new(None),
            fetches: AtomicU64::new(0),
        }
    }

    /// Returns a usable token, fetching a new one on first use or after expiry.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the token endpoint fails or answers malformed JSON.
    /// The cache is left empty in that case.
    pub fn get_valid_token(&self) -> Result<CachedToken, ClientError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = slot.as_ref()
            && !token.is_expired_at(self.clock.now())
        {
            return Ok(token.clone());
        }
        *slot = None;
        let token = self.fetch()?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Returns the held token without validating or refreshing it.
    #[must_use]
    pub fn current(&self) -> Option<CachedToken> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drops the held token so the next call fetches a fresh one.
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns how many token endpoint requests this cache has issued.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Performs one password-grant request.
    fn fetch(&self) -> Result<CachedToken, ClientError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(
            token_url = %self.grant.token_url,
            client_id = %self.grant.client_id,
            "fetching token"
        );
        let response = self
            .client
            .post(&self.grant.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(self.grant.form_body())
            .send()
            .map_err(|err| ClientError::from_send(&err))?;
        let body = read_checked_body(response)?;
        let decoded = decode_token_response(&body)?;
        let token = CachedToken::issue(decoded, self.clock.now())?;
        info!(expires_at = %token.expires_at, "token refreshed");
        Ok(token)
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("grant", &self.grant)
            .field("token", &self.current())
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}
