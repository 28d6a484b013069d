// crates/datakwip-clients/src/ui.rs
// ============================================================================
// Module: UI Client
// Description: Login, navigation, and query flows over an external browser.
// Purpose: Drive the DataKwip web UI through a pluggable browser engine.
// Dependencies: thiserror, tracing
// ============================================================================

//! ## Overview
//! The browser engine is an external collaborator behind [`BrowserDriver`].
//! [`UiClient`] sequences navigate/fill/click/wait calls on top of it. When a
//! flow fails, the client saves a best-effort screenshot and then returns the
//! error; a failed screenshot is logged and never masks the original error.
//! Invariants:
//! - Every flow requires `start()` first and fails with `NotStarted` otherwise.
//! - The engine session is shut down at most once, on `close()` or drop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Viewport width used for every session.
pub const VIEWPORT_WIDTH: u32 = 1920;
/// Viewport height used for every session.
pub const VIEWPORT_HEIGHT: u32 = 1080;
/// Wait for the identity-provider redirects during login.
pub const LOGIN_REDIRECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Wait for the signed-in marker after login.
pub const USER_MENU_TIMEOUT: Duration = Duration::from_secs(5);
/// Wait for query results.
pub const QUERY_RESULTS_TIMEOUT: Duration = Duration::from_secs(15);

/// Login form username input.
pub const USERNAME_INPUT: &str = r#"input[name="username"]"#;
/// Login form password input.
pub const PASSWORD_INPUT: &str = r#"input[name="password"]"#;
/// Login form submit button.
pub const SUBMIT_BUTTON: &str = r#"input[type="submit"]"#;
/// Marker rendered only for signed-in users.
pub const USER_MENU: &str = r#"[data-testid="user-menu"]"#;
/// Link into the Data Explorer.
pub const DATA_EXPLORER_LINK: &str = r#"a[href*="data-explorer"], a:has-text("Data Explorer")"#;
/// Query text input.
pub const QUERY_INPUT: &str = r#"textarea[name="query"], input[name="query"]"#;
/// Query execute button.
pub const EXECUTE_BUTTON: &str = r#"button:has-text("Execute"), button:has-text("Run")"#;
/// Query results container.
pub const QUERY_RESULTS: &str = r#"[data-testid="query-results"]"#;
/// Query results count label.
pub const RESULTS_COUNT: &str = r#"[data-testid="results-count"]"#;

/// URL fragment identifying the Data Explorer page.
const DATA_EXPLORER_FRAGMENT: &str = "data-explorer";
/// Screenshot name for login failures.
pub const LOGIN_FAILURE_SHOT: &str = "login_failure";
/// Screenshot name for navigation failures.
pub const NAVIGATION_FAILURE_SHOT: &str = "navigation_failure";
/// Screenshot name for query failures.
pub const QUERY_FAILURE_SHOT: &str = "query_failure";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// UI automation errors.
///
/// # Invariants
/// - Flow errors (`Login`, `Navigation`, `Query`) are returned after the
///   failure screenshot attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UiError {
    /// A flow ran before `start()`.
    #[error("browser not started; call start() first")]
    NotStarted,
    /// Unsupported browser type name.
    #[error("invalid browser type: {0}")]
    InvalidBrowser(String),
    /// The browser engine reported a failure (selector or navigation timeout).
    #[error("browser driver error: {0}")]
    Driver(String),
    /// Login flow failed.
    #[error("login failed: {0}")]
    Login(String),
    /// Navigation flow failed.
    #[error("navigation failed: {0}")]
    Navigation(String),
    /// Query flow failed.
    #[error("query execution failed: {0}")]
    Query(String),
    /// Screenshot capture failed.
    #[error("screenshot failed: {0}")]
    Screenshot(String),
}

// ============================================================================
// SECTION: Browser Options
// ============================================================================

/// Supported browser engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserType {
    /// Chromium.
    #[default]
    Chromium,
    /// Firefox.
    Firefox,
    /// WebKit.
    Webkit,
}

impl BrowserType {
    /// Returns the canonical engine name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }
}

impl FromStr for BrowserType {
    type Err = UiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(Self::Chromium),
            "firefox" => Ok(Self::Firefox),
            "webkit" => Ok(Self::Webkit),
            _ => Err(UiError::InvalidBrowser(value.to_string())),
        }
    }
}

impl fmt::Display for BrowserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page load milestones a driver can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// `load` event fired.
    Load,
    /// `DOMContentLoaded` event fired.
    DomContentLoaded,
    /// No network activity for a short quiet period.
    NetworkIdle,
}

impl LoadState {
    /// Returns the engine's name for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

/// Session launch options handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Browser engine.
    pub browser: BrowserType,
    /// Whether to run without a window.
    pub headless: bool,
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
    /// Whether TLS errors are ignored.
    pub ignore_https_errors: bool,
    /// Default timeout for every engine action.
    pub default_timeout: Duration,
}

// ============================================================================
// SECTION: Driver Contract
// ============================================================================

/// Browser engine contract.
///
/// Implementations return [`UiError::Driver`] for engine-level failures.
pub trait BrowserDriver {
    /// Starts a browser session.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] when the engine cannot start.
    fn launch(&mut self, options: &LaunchOptions) -> Result<(), UiError>;

    /// Navigates to an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] on navigation failure.
    fn goto(&mut self, url: &str) -> Result<(), UiError>;

    /// Waits until the page URL matches a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] on timeout.
    fn wait_for_url(&mut self, pattern: &str, timeout: Duration) -> Result<(), UiError>;

    /// Fills an input.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] when the selector does not resolve.
    fn fill(&mut self, selector: &str, value: &str) -> Result<(), UiError>;

    /// Clicks an element.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] when the selector does not resolve.
    fn click(&mut self, selector: &str) -> Result<(), UiError>;

    /// Waits for an element to appear.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] on timeout.
    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), UiError>;

    /// Waits for a load milestone.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] on timeout.
    fn wait_for_load_state(&mut self, state: LoadState) -> Result<(), UiError>;

    /// Reads an element's text content, if the element exists.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] on engine failure.
    fn text_content(&mut self, selector: &str) -> Result<Option<String>, UiError>;

    /// Returns the current page URL.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] on engine failure.
    fn current_url(&mut self) -> Result<String, UiError>;

    /// Returns the current page title.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] on engine failure.
    fn title(&mut self) -> Result<String, UiError>;

    /// Writes a PNG screenshot of the page.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] on engine or filesystem failure.
    fn screenshot(&mut self, path: &Path) -> Result<(), UiError>;

    /// Ends the browser session.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] when the engine reports a shutdown failure.
    fn shutdown(&mut self) -> Result<(), UiError>;
}

// ============================================================================
// SECTION: UI Client
// ============================================================================

/// UI client configuration.
#[derive(Clone)]
pub struct UiClientConfig {
    /// UI base URL; a trailing `/` is stripped.
    pub base_url: String,
    /// Identity-provider realm the login page belongs to.
    pub realm: String,
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Whether to run headless.
    pub headless: bool,
    /// Browser engine.
    pub browser: BrowserType,
    /// Default engine timeout.
    pub timeout: Duration,
    /// Directory for failure screenshots; `None` disables capture.
    pub screenshot_dir: Option<PathBuf>,
}

impl fmt::Debug for UiClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiClientConfig")
            .field("base_url", &self.base_url)
            .field("realm", &self.realm)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("headless", &self.headless)
            .field("browser", &self.browser)
            .field("timeout", &self.timeout)
            .field("screenshot_dir", &self.screenshot_dir)
            .finish()
    }
}

/// Summary of an executed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Text of the results count label, if rendered.
    pub results_summary: Option<String>,
    /// Page URL after the query ran.
    pub url: String,
}

/// UI flows over a [`BrowserDriver`].
pub struct UiClient<D: BrowserDriver> {
    /// Immutable configuration.
    config: UiClientConfig,
    /// Base URL without a trailing slash.
    base_url: String,
    /// Browser engine.
    driver: D,
    /// Whether `start()` succeeded.
    started: bool,
    /// Whether the session has been shut down.
    closed: bool,
    /// Most recent screenshot written on failure.
    last_screenshot: Option<PathBuf>,
}

impl<D: BrowserDriver> UiClient<D> {
    /// Wraps a driver; no engine calls happen until [`UiClient::start`].
    #[must_use]
    pub fn new(config: UiClientConfig, driver: D) -> Self {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Self {
            config,
            base_url,
            driver,
            started: false,
            closed: false,
            last_screenshot: None,
        }
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the path of the most recent failure screenshot.
    #[must_use]
    pub fn last_screenshot(&self) -> Option<&Path> {
        self.last_screenshot.as_deref()
    }

    /// Returns the wrapped driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Launches the browser session.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] when the engine cannot start.
    pub fn start(&mut self) -> Result<(), UiError> {
        let options = LaunchOptions {
            browser: self.config.browser,
            headless: self.config.headless,
            viewport_width: VIEWPORT_WIDTH,
            viewport_height: VIEWPORT_HEIGHT,
            ignore_https_errors: true,
            default_timeout: self.config.timeout,
        };
        self.driver.launch(&options)?;
        self.started = true;
        self.closed = false;
        info!(browser = %self.config.browser, headless = self.config.headless, "browser started");
        Ok(())
    }

    /// Signs in through the identity-provider login page.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NotStarted`] before `start`, else [`UiError::Login`].
    pub fn login(&mut self) -> Result<(), UiError> {
        self.ensure_started()?;
        let outcome = self.login_steps();
        self.finish(outcome, LOGIN_FAILURE_SHOT, UiError::Login)
    }

    /// Opens the Data Explorer from the current page.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NotStarted`] before `start`, else [`UiError::Navigation`].
    pub fn navigate_to_data_explorer(&mut self) -> Result<(), UiError> {
        self.ensure_started()?;
        let outcome = self.data_explorer_steps();
        self.finish(outcome, NAVIGATION_FAILURE_SHOT, UiError::Navigation)
    }

    /// Opens `path` relative to the base URL and waits for the network to settle.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NotStarted`] before `start`, else [`UiError::Navigation`].
    pub fn navigate(&mut self, path: &str) -> Result<(), UiError> {
        self.ensure_started()?;
        let target = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let outcome = self
            .driver
            .goto(&target)
            .and_then(|()| self.driver.wait_for_load_state(LoadState::NetworkIdle))
            .map_err(|err| err.to_string());
        self.finish(outcome, NAVIGATION_FAILURE_SHOT, UiError::Navigation)
    }

    /// Runs a query in the Data Explorer, optionally typing `query` first.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NotStarted`] before `start`, else [`UiError::Query`].
    pub fn execute_query(&mut self, query: Option<&str>) -> Result<QueryOutcome, UiError> {
        self.ensure_started()?;
        let outcome = self.query_steps(query);
        self.finish(outcome, QUERY_FAILURE_SHOT, UiError::Query)
    }

    /// Returns the current page title.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NotStarted`] before `start`, else driver errors.
    pub fn page_title(&mut self) -> Result<String, UiError> {
        self.ensure_started()?;
        self.driver.title()
    }

    /// Returns the current page URL.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NotStarted`] before `start`, else driver errors.
    pub fn current_url(&mut self) -> Result<String, UiError> {
        self.ensure_started()?;
        self.driver.current_url()
    }

    /// Writes `<screenshot_dir>/<name>.png`.
    ///
    /// Returns `Ok(None)` when no screenshot directory is configured.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::Screenshot`] when the directory or image cannot be written.
    pub fn capture_screenshot(&mut self, name: &str) -> Result<Option<PathBuf>, UiError> {
        self.ensure_started()?;
        let Some(dir) = self.config.screenshot_dir.clone() else {
            return Ok(None);
        };
        fs::create_dir_all(&dir).map_err(|err| UiError::Screenshot(err.to_string()))?;
        let path = dir.join(format!("{name}.png"));
        self.driver.screenshot(&path).map_err(|err| UiError::Screenshot(err.to_string()))?;
        info!(path = %path.display(), "screenshot saved");
        self.last_screenshot = Some(path.clone());
        Ok(Some(path))
    }

    /// Shuts the browser session down; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`UiError`] when the engine reports a shutdown failure.
    pub fn close(&mut self) -> Result<(), UiError> {
        if !self.started || self.closed {
            return Ok(());
        }
        self.closed = true;
        self.started = false;
        self.driver.shutdown()
    }

    /// Fails with `NotStarted` unless a session is live.
    fn ensure_started(&self) -> Result<(), UiError> {
        if self.started { Ok(()) } else { Err(UiError::NotStarted) }
    }

    /// Screenshots on failure and maps the message into the flow's error.
    fn finish<T>(
        &mut self,
        outcome: Result<T, String>,
        shot: &str,
        wrap: fn(String) -> UiError,
    ) -> Result<T, UiError> {
        match outcome {
            Ok(value) => Ok(value),
            Err(message) => {
                if let Err(err) = self.capture_screenshot(shot) {
                    warn!(error = %err, shot, "failure screenshot not saved");
                }
                Err(wrap(message))
            }
        }
    }

    /// Login sequence; errors are flattened to messages.
    fn login_steps(&mut self) -> Result<(), String> {
        let login_pattern = format!("**/realms/{}/protocol/openid-connect/**", self.config.realm);
        let app_pattern = format!("{}/**", self.base_url);
        self.driver.goto(&self.base_url).map_err(|err| err.to_string())?;
        self.driver
            .wait_for_url(&login_pattern, LOGIN_REDIRECT_TIMEOUT)
            .map_err(|err| err.to_string())?;
        self.driver.fill(USERNAME_INPUT, &self.config.username).map_err(|err| err.to_string())?;
        self.driver.fill(PASSWORD_INPUT, &self.config.password).map_err(|err| err.to_string())?;
        self.driver.click(SUBMIT_BUTTON).map_err(|err| err.to_string())?;
        self.driver
            .wait_for_url(&app_pattern, LOGIN_REDIRECT_TIMEOUT)
            .map_err(|err| err.to_string())?;
        if self.driver.wait_for_selector(USER_MENU, USER_MENU_TIMEOUT).is_err() {
            let url = self.driver.current_url().map_err(|err| err.to_string())?;
            if url.contains(&format!("realms/{}", self.config.realm)) {
                return Err("still on login page after submission".to_string());
            }
        }
        Ok(())
    }

    /// Data Explorer navigation sequence.
    fn data_explorer_steps(&mut self) -> Result<(), String> {
        self.driver.click(DATA_EXPLORER_LINK).map_err(|err| err.to_string())?;
        self.driver.wait_for_load_state(LoadState::NetworkIdle).map_err(|err| err.to_string())?;
        let url = self.driver.current_url().map_err(|err| err.to_string())?;
        if url.to_lowercase().contains(DATA_EXPLORER_FRAGMENT) {
            Ok(())
        } else {
            Err(format!("not on data explorer page: {url}"))
        }
    }

    /// Query execution sequence.
    fn query_steps(&mut self, query: Option<&str>) -> Result<QueryOutcome, String> {
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            self.driver.fill(QUERY_INPUT, query).map_err(|err| err.to_string())?;
        }
        self.driver.click(EXECUTE_BUTTON).map_err(|err| err.to_string())?;
        self.driver
            .wait_for_selector(QUERY_RESULTS, QUERY_RESULTS_TIMEOUT)
            .map_err(|err| err.to_string())?;
        let results_summary =
            self.driver.text_content(RESULTS_COUNT).map_err(|err| err.to_string())?;
        let url = self.driver.current_url().map_err(|err| err.to_string())?;
        Ok(QueryOutcome {
            results_summary,
            url,
        })
    }
}

impl<D: BrowserDriver> fmt::Debug for UiClient<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiClient")
            .field("config", &self.config)
            .field("started", &self.started)
            .field("closed", &self.closed)
            .field("last_screenshot", &self.last_screenshot)
            .finish_non_exhaustive()
    }
}

impl<D: BrowserDriver> Drop for UiClient<D> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "browser shutdown failed");
        }
    }
}
