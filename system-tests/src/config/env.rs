// system-tests/src/config/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed configuration for the DataKwip harness.
// Purpose: Centralize env parsing with strict UTF-8 validation and defaults.
// Dependencies: datakwip-clients
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8, empty values, non-positive timeouts, and
//! unknown boolean literals fail closed. Process environment wins over values
//! read from a dotenv file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::dotenv::DotenvFile;
use super::target::PlatformCredentials;
use super::target::PlatformEndpoints;
use super::target::PlatformTarget;
use super::target::TestSettings;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Realm used when none is configured.
pub const DEFAULT_REALM: &str = "datakwip";

/// Environment keys for harness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// REST API base URL.
    ApiUrl,
    /// MCP server base URL.
    McpUrl,
    /// Web UI base URL.
    UiUrl,
    /// Public identity-provider URL.
    AuthUrl,
    /// OAuth2 token endpoint.
    OAuth2TokenUrl,
    /// OAuth2 issuer URL.
    OAuth2IssuerUrl,
    /// Identity-provider base URL for the admin API.
    KeycloakBaseUrl,
    /// Realm under test.
    KeycloakRealm,
    /// Admin username.
    KeycloakAdmin,
    /// Admin password.
    KeycloakAdminPassword,
    /// OAuth2 client used by the harness.
    FunctionalTestsClientId,
    /// Secret of the harness client.
    FunctionalTestsClientSecret,
    /// Test user email (also the username).
    FunctionalTestUserEmail,
    /// Test user password.
    FunctionalTestUserPassword,
    /// Organization queried by the suites.
    TestOrgId,
    /// Entity page size.
    TestEntityLimit,
    /// Tag page size.
    TestTagLimit,
    /// API timeout in seconds.
    ApiTimeoutSec,
    /// MCP timeout in seconds.
    McpTimeoutSec,
    /// UI timeout in seconds.
    UiTimeoutSec,
    /// Admin timeout in seconds.
    AuthTimeoutSec,
    /// Run the browser headless.
    HeadlessBrowser,
    /// Browser engine name.
    BrowserType,
    /// Capture screenshots on UI failures.
    ScreenshotOnFailure,
    /// Browser driver executable (optionally with arguments).
    BrowserDriverCli,
    /// Artifact root override.
    RunRoot,
    /// Verify TLS certificates.
    VerifyTls,
}

impl HarnessEnv {
    /// Every key, in documentation order.
    pub const ALL: [Self; 27] = [
        Self::ApiUrl,
        Self::McpUrl,
        Self::UiUrl,
        Self::AuthUrl,
        Self::OAuth2TokenUrl,
        Self::OAuth2IssuerUrl,
        Self::KeycloakBaseUrl,
        Self::KeycloakRealm,
        Self::KeycloakAdmin,
        Self::KeycloakAdminPassword,
        Self::FunctionalTestsClientId,
        Self::FunctionalTestsClientSecret,
        Self::FunctionalTestUserEmail,
        Self::FunctionalTestUserPassword,
        Self::TestOrgId,
        Self::TestEntityLimit,
        Self::TestTagLimit,
        Self::ApiTimeoutSec,
        Self::McpTimeoutSec,
        Self::UiTimeoutSec,
        Self::AuthTimeoutSec,
        Self::HeadlessBrowser,
        Self::BrowserType,
        Self::ScreenshotOnFailure,
        Self::BrowserDriverCli,
        Self::RunRoot,
        Self::VerifyTls,
    ];

    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiUrl => "DATAKWIP_API_URL",
            Self::McpUrl => "DATAKWIP_MCP_URL",
            Self::UiUrl => "DATAKWIP_UI_URL",
            Self::AuthUrl => "DATAKWIP_AUTH_URL",
            Self::OAuth2TokenUrl => "DATAKWIP_OAUTH2_TOKEN_URL",
            Self::OAuth2IssuerUrl => "DATAKWIP_OAUTH2_ISSUER_URL",
            Self::KeycloakBaseUrl => "DATAKWIP_KEYCLOAK_BASE_URL",
            Self::KeycloakRealm => "DATAKWIP_KEYCLOAK_REALM",
            Self::KeycloakAdmin => "DATAKWIP_KEYCLOAK_ADMIN",
            Self::KeycloakAdminPassword => "DATAKWIP_KEYCLOAK_ADMIN_PASSWORD",
            Self::FunctionalTestsClientId => "DATAKWIP_FUNCTIONAL_TESTS_CLIENT_ID",
            Self::FunctionalTestsClientSecret => "DATAKWIP_FUNCTIONAL_TESTS_CLIENT_SECRET",
            Self::FunctionalTestUserEmail => "DATAKWIP_FUNCTIONAL_TEST_USER_EMAIL",
            Self::FunctionalTestUserPassword => "DATAKWIP_FUNCTIONAL_TEST_USER_PASSWORD",
            Self::TestOrgId => "DATAKWIP_TEST_ORG_ID",
            Self::TestEntityLimit => "DATAKWIP_TEST_ENTITY_LIMIT",
            Self::TestTagLimit => "DATAKWIP_TEST_TAG_LIMIT",
            Self::ApiTimeoutSec => "DATAKWIP_API_TIMEOUT_SEC",
            Self::McpTimeoutSec => "DATAKWIP_MCP_TIMEOUT_SEC",
            Self::UiTimeoutSec => "DATAKWIP_UI_TIMEOUT_SEC",
            Self::AuthTimeoutSec => "DATAKWIP_AUTH_TIMEOUT_SEC",
            Self::HeadlessBrowser => "DATAKWIP_HEADLESS_BROWSER",
            Self::BrowserType => "DATAKWIP_BROWSER_TYPE",
            Self::ScreenshotOnFailure => "DATAKWIP_SCREENSHOT_ON_FAILURE",
            Self::BrowserDriverCli => "DATAKWIP_BROWSER_DRIVER_CLI",
            Self::RunRoot => "DATAKWIP_RUN_ROOT",
            Self::VerifyTls => "DATAKWIP_VERIFY_TLS",
        }
    }
}

impl fmt::Display for HarnessEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed harness configuration derived from environment variables.
///
/// Endpoint and credential keys are optional; the live platform is targeted
/// only when all of them are present (see [`HarnessConfig::live_target`]).
#[derive(Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// REST API base URL.
    pub api_url: Option<String>,
    /// MCP server base URL.
    pub mcp_url: Option<String>,
    /// Web UI base URL.
    pub ui_url: Option<String>,
    /// Public identity-provider URL.
    pub auth_url: Option<String>,
    /// OAuth2 token endpoint.
    pub token_url: Option<String>,
    /// OAuth2 issuer URL.
    pub issuer_url: Option<String>,
    /// Identity-provider base URL for the admin API.
    pub keycloak_base_url: Option<String>,
    /// Realm under test.
    pub realm: String,
    /// Admin username.
    pub admin_username: Option<String>,
    /// Admin password.
    pub admin_password: Option<String>,
    /// Harness OAuth2 client id.
    pub client_id: Option<String>,
    /// Harness OAuth2 client secret.
    pub client_secret: Option<String>,
    /// Test user email.
    pub user_email: Option<String>,
    /// Test user password.
    pub user_password: Option<String>,
    /// Browser driver command line.
    pub browser_driver_cli: Option<String>,
    /// Artifact root override.
    pub run_root: Option<PathBuf>,
    /// Limits, timeouts, and browser toggles.
    pub settings: TestSettings,
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("api_url", &self.api_url)
            .field("mcp_url", &self.mcp_url)
            .field("ui_url", &self.ui_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("issuer_url", &self.issuer_url)
            .field("keycloak_base_url", &self.keycloak_base_url)
            .field("realm", &self.realm)
            .field("admin_username", &self.admin_username)
            .field("client_id", &self.client_id)
            .field("user_email", &self.user_email)
            .field("browser_driver_cli", &self.browser_driver_cli)
            .field("run_root", &self.run_root)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl HarnessConfig {
    /// Loads configuration from the process environment and the working
    /// directory's dotenv file.
    ///
    /// # Errors
    ///
    /// Returns an error when a value is not valid UTF-8, is empty, or fails
    /// validation, or when the dotenv file is malformed.
    pub fn load() -> Result<Self, String> {
        let cwd = std::env::current_dir()
            .map_err(|err| format!("current directory unavailable: {err}"))?;
        Self::load_from(&cwd)
    }

    /// Loads configuration using the dotenv file found in `dir`.
    ///
    /// # Errors
    ///
    /// Same as [`HarnessConfig::load`].
    pub fn load_from(dir: &Path) -> Result<Self, String> {
        let file_values = DotenvFile::discover(dir)?.map(|file| file.values).unwrap_or_default();
        Self::from_lookup(|name| match read_env_strict(name)? {
            Some(value) => Ok(Some(value)),
            None => Ok(file_values.get(name).cloned()),
        })
    }

    /// Builds configuration from an explicit key/value map.
    ///
    /// # Errors
    ///
    /// Same validation as [`HarnessConfig::load`].
    pub fn from_map(values: &BTreeMap<String, String>) -> Result<Self, String> {
        Self::from_lookup(|name| Ok(values.get(name).cloned()))
    }

    /// Builds configuration from a lookup function.
    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Result<Option<String>, String>,
    {
        let read = |key: HarnessEnv| read_nonempty(&lookup, key);
        let defaults = TestSettings::default();
        let settings = TestSettings {
            org_id: parse_or(key_value(&read, HarnessEnv::TestOrgId)?, defaults.org_id)?,
            entity_limit: parse_positive(
                key_value(&read, HarnessEnv::TestEntityLimit)?,
                defaults.entity_limit,
            )?,
            tag_limit: parse_positive(
                key_value(&read, HarnessEnv::TestTagLimit)?,
                defaults.tag_limit,
            )?,
            api_timeout: parse_timeout(
                key_value(&read, HarnessEnv::ApiTimeoutSec)?,
                defaults.api_timeout,
            )?,
            mcp_timeout: parse_timeout(
                key_value(&read, HarnessEnv::McpTimeoutSec)?,
                defaults.mcp_timeout,
            )?,
            ui_timeout: parse_timeout(
                key_value(&read, HarnessEnv::UiTimeoutSec)?,
                defaults.ui_timeout,
            )?,
            auth_timeout: parse_timeout(
                key_value(&read, HarnessEnv::AuthTimeoutSec)?,
                defaults.auth_timeout,
            )?,
            headless: parse_bool(
                key_value(&read, HarnessEnv::HeadlessBrowser)?,
                defaults.headless,
            )?,
            browser: parse_or(key_value(&read, HarnessEnv::BrowserType)?, defaults.browser)?,
            screenshot_on_failure: parse_bool(
                key_value(&read, HarnessEnv::ScreenshotOnFailure)?,
                defaults.screenshot_on_failure,
            )?,
            verify_tls: parse_bool(key_value(&read, HarnessEnv::VerifyTls)?, defaults.verify_tls)?,
        };
        Ok(Self {
            api_url: read(HarnessEnv::ApiUrl)?,
            mcp_url: read(HarnessEnv::McpUrl)?,
            ui_url: read(HarnessEnv::UiUrl)?,
            auth_url: read(HarnessEnv::AuthUrl)?,
            token_url: read(HarnessEnv::OAuth2TokenUrl)?,
            issuer_url: read(HarnessEnv::OAuth2IssuerUrl)?,
            keycloak_base_url: read(HarnessEnv::KeycloakBaseUrl)?,
            realm: read(HarnessEnv::KeycloakRealm)?.unwrap_or_else(|| DEFAULT_REALM.to_string()),
            admin_username: read(HarnessEnv::KeycloakAdmin)?,
            admin_password: read(HarnessEnv::KeycloakAdminPassword)?,
            client_id: read(HarnessEnv::FunctionalTestsClientId)?,
            client_secret: read(HarnessEnv::FunctionalTestsClientSecret)?,
            user_email: read(HarnessEnv::FunctionalTestUserEmail)?,
            user_password: read(HarnessEnv::FunctionalTestUserPassword)?,
            browser_driver_cli: read(HarnessEnv::BrowserDriverCli)?,
            run_root: read(HarnessEnv::RunRoot)?.map(PathBuf::from),
            settings,
        })
    }

    /// Returns the endpoint and credential keys that are not set.
    #[must_use]
    pub fn missing_live_keys(&self) -> Vec<HarnessEnv> {
        [
            (HarnessEnv::ApiUrl, &self.api_url),
            (HarnessEnv::McpUrl, &self.mcp_url),
            (HarnessEnv::UiUrl, &self.ui_url),
            (HarnessEnv::OAuth2TokenUrl, &self.token_url),
            (HarnessEnv::KeycloakBaseUrl, &self.keycloak_base_url),
            (HarnessEnv::KeycloakAdmin, &self.admin_username),
            (HarnessEnv::KeycloakAdminPassword, &self.admin_password),
            (HarnessEnv::FunctionalTestsClientId, &self.client_id),
            (HarnessEnv::FunctionalTestsClientSecret, &self.client_secret),
            (HarnessEnv::FunctionalTestUserEmail, &self.user_email),
            (HarnessEnv::FunctionalTestUserPassword, &self.user_password),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect()
    }

    /// Returns the live platform target when every endpoint and credential is set.
    #[must_use]
    pub fn live_target(&self) -> Option<PlatformTarget> {
        let endpoints = PlatformEndpoints {
            api_url: self.api_url.clone()?,
            mcp_url: self.mcp_url.clone()?,
            ui_url: self.ui_url.clone()?,
            token_url: self.token_url.clone()?,
            auth_server_url: self.keycloak_base_url.clone()?,
            realm: self.realm.clone(),
        };
        let credentials = PlatformCredentials {
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            user_email: self.user_email.clone()?,
            user_password: self.user_password.clone()?,
            admin_username: self.admin_username.clone()?,
            admin_password: self.admin_password.clone()?,
        };
        Some(PlatformTarget {
            endpoints,
            credentials,
            settings: self.settings.clone(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads a key through `lookup` and rejects empty values.
fn read_nonempty<F>(lookup: &F, key: HarnessEnv) -> Result<Option<String>, String>
where
    F: Fn(&str) -> Result<Option<String>, String>,
{
    match lookup(key.as_str())? {
        Some(value) if value.trim().is_empty() => Err(format!("{key} must not be empty")),
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

/// Pairs a key with its raw value so parse errors can name it.
fn key_value<R>(read: &R, key: HarnessEnv) -> Result<(HarnessEnv, Option<String>), String>
where
    R: Fn(HarnessEnv) -> Result<Option<String>, String>,
{
    Ok((key, read(key)?))
}

/// Parses a value with `FromStr`, falling back to `default` when unset.
fn parse_or<T>((key, raw): (HarnessEnv, Option<String>), default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.map_or(Ok(default), |value| value.parse().map_err(|err| format!("{key}: {err}")))
}

/// Parses a strictly positive integer.
fn parse_positive((key, raw): (HarnessEnv, Option<String>), default: u32) -> Result<u32, String> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.parse::<u32>() {
        Ok(0) => Err(format!("{key} must be greater than zero")),
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(format!("{key} must be a positive integer")),
    }
}

/// Parses a positive timeout in whole seconds.
fn parse_timeout(
    (key, raw): (HarnessEnv, Option<String>),
    default: Duration,
) -> Result<Duration, String> {
    let Some(value) = raw else {
        return Ok(default);
    };
    let secs: u64 =
        value.parse().map_err(|_| format!("{key} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{key} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a boolean literal (`true`/`false`/`1`/`0`).
fn parse_bool((key, raw): (HarnessEnv, Option<String>), default: bool) -> Result<bool, String> {
    let Some(value) = raw else {
        return Ok(default);
    };
    if value.eq_ignore_ascii_case("true") || value == "1" {
        return Ok(true);
    }
    if value.eq_ignore_ascii_case("false") || value == "0" {
        return Ok(false);
    }
    Err(format!("{key} must be 1, 0, true, or false"))
}
