// system-tests/src/config/target.rs
// ============================================================================
// Module: Platform Target
// Description: Resolved endpoints, credentials, and settings for one run.
// Purpose: Build client configurations for the live platform or the stub.
// Dependencies: datakwip-clients
// ============================================================================

//! ## Overview
//! A [`PlatformTarget`] is complete by construction: every URL and credential
//! is present. Suites build their clients exclusively through it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use datakwip_clients::AdminClientConfig;
use datakwip_clients::ApiClientConfig;
use datakwip_clients::BrowserType;
use datakwip_clients::McpClientConfig;
use datakwip_clients::UiClientConfig;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Test data limits, timeouts, and browser toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSettings {
    /// Organization queried by the suites.
    pub org_id: i64,
    /// Entity page size.
    pub entity_limit: u32,
    /// Tag page size.
    pub tag_limit: u32,
    /// API client timeout.
    pub api_timeout: Duration,
    /// MCP client timeout.
    pub mcp_timeout: Duration,
    /// UI engine timeout.
    pub ui_timeout: Duration,
    /// Admin client timeout.
    pub auth_timeout: Duration,
    /// Run the browser headless.
    pub headless: bool,
    /// Browser engine.
    pub browser: BrowserType,
    /// Capture screenshots on UI failures.
    pub screenshot_on_failure: bool,
    /// Verify TLS certificates on the admin API.
    pub verify_tls: bool,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            org_id: 1,
            entity_limit: 10,
            tag_limit: 20,
            api_timeout: Duration::from_secs(30),
            mcp_timeout: Duration::from_secs(30),
            ui_timeout: Duration::from_secs(60),
            auth_timeout: Duration::from_secs(30),
            headless: true,
            browser: BrowserType::Chromium,
            screenshot_on_failure: true,
            verify_tls: false,
        }
    }
}

/// Base URLs of the four platform surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformEndpoints {
    /// REST API base URL.
    pub api_url: String,
    /// MCP server base URL.
    pub mcp_url: String,
    /// Web UI base URL.
    pub ui_url: String,
    /// OAuth2 token endpoint for the harness client.
    pub token_url: String,
    /// Identity-provider base URL (admin API and login pages).
    pub auth_server_url: String,
    /// Realm under test.
    pub realm: String,
}

/// Credentials used by the suites.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformCredentials {
    /// Harness OAuth2 client id.
    pub client_id: String,
    /// Harness OAuth2 client secret.
    pub client_secret: String,
    /// Test user email (also the username).
    pub user_email: String,
    /// Test user password.
    pub user_password: String,
    /// Identity-provider admin username.
    pub admin_username: String,
    /// Identity-provider admin password.
    pub admin_password: String,
}

impl fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_email", &self.user_email)
            .field("user_password", &"<redacted>")
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

/// Fully resolved deployment to test against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTarget {
    /// Surface URLs.
    pub endpoints: PlatformEndpoints,
    /// Credentials.
    pub credentials: PlatformCredentials,
    /// Limits and timeouts.
    pub settings: TestSettings,
}

// ============================================================================
// SECTION: Client Configurations
// ============================================================================

impl PlatformTarget {
    /// Builds the REST API client configuration.
    #[must_use]
    pub fn api_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.endpoints.api_url.clone(),
            token_url: self.endpoints.token_url.clone(),
            client_id: self.credentials.client_id.clone(),
            client_secret: self.credentials.client_secret.clone(),
            username: self.credentials.user_email.clone(),
            password: self.credentials.user_password.clone(),
            timeout: self.settings.api_timeout,
            verify_tls: true,
        }
    }

    /// Builds the MCP client configuration; the MCP server is called anonymously.
    #[must_use]
    pub fn mcp_config(&self) -> McpClientConfig {
        McpClientConfig::new(&self.endpoints.mcp_url, self.settings.mcp_timeout)
    }

    /// Builds the realm admin client configuration.
    #[must_use]
    pub fn admin_config(&self) -> AdminClientConfig {
        AdminClientConfig {
            server_url: self.endpoints.auth_server_url.clone(),
            realm: self.endpoints.realm.clone(),
            admin_username: self.credentials.admin_username.clone(),
            admin_password: self.credentials.admin_password.clone(),
            timeout: self.settings.auth_timeout,
            verify_tls: self.settings.verify_tls,
        }
    }

    /// Builds the UI client configuration for the test user.
    ///
    /// `screenshot_dir` is dropped when screenshots are disabled.
    #[must_use]
    pub fn ui_config(&self, screenshot_dir: Option<PathBuf>) -> UiClientConfig {
        self.ui_config_as(
            &self.credentials.user_email,
            &self.credentials.user_password,
            screenshot_dir,
        )
    }

    /// Builds a UI client configuration for arbitrary credentials.
    #[must_use]
    pub fn ui_config_as(
        &self,
        username: &str,
        password: &str,
        screenshot_dir: Option<PathBuf>,
    ) -> UiClientConfig {
        UiClientConfig {
            base_url: self.endpoints.ui_url.clone(),
            realm: self.endpoints.realm.clone(),
            username: username.to_string(),
            password: password.to_string(),
            headless: self.settings.headless,
            browser: self.settings.browser,
            timeout: self.settings.ui_timeout,
            screenshot_dir: screenshot_dir.filter(|_| self.settings.screenshot_on_failure),
        }
    }
}
