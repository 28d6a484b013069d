// crates/datakwip-clients/src/dispatch.rs
// ============================================================================
// Module: Authenticated Request Dispatcher
// Description: Single-shot HTTP dispatch with optional bearer token injection.
// Purpose: Share request construction and status handling across clients.
// Dependencies: reqwest, serde, serde_json, tracing, url
// ============================================================================

//! ## Overview
//! [`Dispatcher`] owns one blocking HTTP client, one base URL, and at most one
//! [`TokenCache`]. Each call performs exactly one network request; a non-2xx
//! status surfaces as [`ClientError::Transport`] with the status and body.
//! Invariants:
//! - No request is ever retried, including a 401 caused by a token that went
//!   stale in flight.
//! - Response bodies are capped at [`MAX_RESPONSE_BYTES`].
//! - The per-client timeout applies uniformly to every request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;
use std::time::Instant;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::token::PasswordGrant;
use crate::token::TokenCache;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum response body size accepted from any endpoint.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Maximum number of body bytes echoed into a transport error.
const ERROR_BODY_PREVIEW_BYTES: usize = 4 * 1024;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Construction settings for a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Base URL; a trailing `/` is stripped.
    pub base_url: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
    /// Optional grant for authenticated requests.
    pub grant: Option<PasswordGrant>,
    /// Whether TLS certificates are verified.
    pub verify_tls: bool,
}

impl DispatcherSettings {
    /// Creates settings with TLS verification enabled and no credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            grant: None,
            verify_tls: true,
        }
    }

    /// Attaches credentials for authenticated requests.
    #[must_use]
    pub fn with_grant(mut self, grant: PasswordGrant) -> Self {
        self.grant = Some(grant);
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Successful (2xx) response captured by the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl DispatchResponse {
    /// Decodes the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| ClientError::Decode(format!("invalid json body: {err}")))
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Blocking HTTP dispatcher with optional bearer authentication.
#[derive(Debug)]
pub struct Dispatcher {
    /// Shared blocking HTTP client.
    client: Client,
    /// Normalized base URL without a trailing slash.
    base_url: String,
    /// Token cache for authenticated calls.
    tokens: Option<TokenCache>,
}

impl Dispatcher {
    /// Builds a dispatcher from settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the base URL is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(settings: DispatcherSettings) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&settings.base_url)?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build http client: {err}")))?;
        let tokens = settings.grant.map(|grant| TokenCache::new(client.clone(), grant));
        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// Builds a dispatcher around an existing token cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the base URL is invalid.
    pub fn with_token_cache(
        base_url: &str,
        client: Client,
        tokens: TokenCache,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
            tokens: Some(tokens),
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the token cache when credentials are configured.
    #[must_use]
    pub const fn token_cache(&self) -> Option<&TokenCache> {
        self.tokens.as_ref()
    }

    /// Issues one request against `base_url + path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when token acquisition fails, the request cannot be
    /// sent, or the server answers with a non-2xx status.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        require_auth: bool,
    ) -> Result<DispatchResponse, ClientError> {
        let url = self.build_url(path, query)?;
        let mut request = self.client.request(method.clone(), url.as_str());
        request = request.header(ACCEPT, HeaderValue::from_static("application/json"));
        if require_auth {
            let tokens = self.tokens.as_ref().ok_or_else(|| {
                ClientError::Config("authentication required but no credentials configured".into())
            })?;
            let token = tokens.get_valid_token()?;
            let header = HeaderValue::from_str(&format!("Bearer {}", token.access_token()))
                .map_err(|_| ClientError::Config("invalid bearer token header".to_string()))?;
            request = request.header(AUTHORIZATION, header);
        }
        if let Some(body) = body {
            let payload = serde_json::to_vec(body)
                .map_err(|err| {
                    ClientError::Decode(format!("request serialization failed: {err}"))
                })?;
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(payload);
        }

        let started = Instant::now();
        debug!(%method, path, require_auth, "dispatching request");
        let response = request.send().map_err(|err| ClientError::from_send(&err))?;
        let status = response.status().as_u16();
        let result = read_checked_body(response);
        debug!(
            %method,
            path,
            status,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
        Ok(DispatchResponse {
            status,
            body: result?,
        })
    }

    /// Issues a GET and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on dispatch or decode failure.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        require_auth: bool,
    ) -> Result<T, ClientError> {
        self.request(Method::GET, path, query, None, require_auth)?.json()
    }

    /// Joins the base URL, path, and query pairs.
    fn build_url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let joined = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&joined)
            .map_err(|err| ClientError::Config(format!("invalid request url {joined}: {err}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a base URL and strips trailing slashes.
///
/// # Errors
///
/// Returns [`ClientError::Config`] when the URL is not absolute http(s).
pub fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|err| ClientError::Config(format!("invalid base url {raw}: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        scheme => Err(ClientError::Config(format!("unsupported url scheme: {scheme}"))),
    }
}

/// Reads a response body, failing on non-2xx status or oversized payloads.
pub(crate) fn read_checked_body(response: Response) -> Result<Vec<u8>, ClientError> {
    let status = response.status();
    let limit = u64::try_from(MAX_RESPONSE_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let mut body = Vec::new();
    response
        .take(limit)
        .read_to_end(&mut body)
        .map_err(|err| ClientError::Http(format!("failed to read response body: {err}")))?;
    if !status.is_success() {
        let end = body.len().min(ERROR_BODY_PREVIEW_BYTES);
        let preview = String::from_utf8_lossy(body.get(..end).unwrap_or_default());
        return Err(ClientError::Transport {
            status: status.as_u16(),
            body: preview.trim().to_string(),
        });
    }
    if body.len() > MAX_RESPONSE_BYTES {
        return Err(ClientError::Decode(format!(
            "response exceeds size limit ({} > {MAX_RESPONSE_BYTES})",
            body.len()
        )));
    }
    Ok(body)
}
