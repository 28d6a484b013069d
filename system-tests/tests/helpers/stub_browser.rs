// system-tests/tests/helpers/stub_browser.rs
// ============================================================================
// Module: Stub Browser
// Description: Scripted browser engine simulating the DataKwip web UI.
// Purpose: Drive the UI client offline through login, navigation, and query.
// Dependencies: datakwip-clients
// ============================================================================

//! ## Overview
//! [`StubBrowser`] models the pages the UI client walks through: the app
//! redirects anonymous visitors to the identity-provider login page, a
//! correct submission lands on the dashboard, and the Data Explorer renders
//! a results count after a query. Wrong credentials keep the browser on the
//! login page, so the client's redirect wait fails like it does live.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use datakwip_clients::BrowserDriver;
use datakwip_clients::LaunchOptions;
use datakwip_clients::LoadState;
use datakwip_clients::UiError;
use datakwip_clients::ui::DATA_EXPLORER_LINK;
use datakwip_clients::ui::EXECUTE_BUTTON;
use datakwip_clients::ui::PASSWORD_INPUT;
use datakwip_clients::ui::QUERY_INPUT;
use datakwip_clients::ui::QUERY_RESULTS;
use datakwip_clients::ui::RESULTS_COUNT;
use datakwip_clients::ui::SUBMIT_BUTTON;
use datakwip_clients::ui::USER_MENU;
use datakwip_clients::ui::USERNAME_INPUT;

/// Minimal PNG signature written for screenshots.
const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Site layout and the one account the simulated login accepts.
#[derive(Debug, Clone)]
pub struct StubSite {
    /// App base URL.
    pub app_url: String,
    /// Identity-provider base URL hosting the login page.
    pub auth_url: String,
    /// Realm in the login URL.
    pub realm: String,
    /// Accepted username.
    pub username: String,
    /// Accepted password.
    pub password: String,
    /// Rows reported by a query.
    pub result_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Blank,
    Login,
    Dashboard,
    DataExplorer,
}

/// In-memory browser engine for the stub deployment.
#[derive(Debug)]
pub struct StubBrowser {
    site: StubSite,
    launched: Option<LaunchOptions>,
    page: Page,
    url: String,
    authenticated: bool,
    typed_username: String,
    typed_password: String,
    query: Option<String>,
    results_visible: bool,
    screenshots: Vec<PathBuf>,
}

impl StubBrowser {
    /// Creates a browser for `site`.
    pub fn new(site: StubSite) -> Self {
        Self {
            site,
            launched: None,
            page: Page::Blank,
            url: "about:blank".to_string(),
            authenticated: false,
            typed_username: String::new(),
            typed_password: String::new(),
            query: None,
            results_visible: false,
            screenshots: Vec::new(),
        }
    }

    /// Returns the options passed to the last launch.
    pub const fn launch_options(&self) -> Option<&LaunchOptions> {
        self.launched.as_ref()
    }

    /// Returns every screenshot path written.
    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    /// Returns the query typed into the Data Explorer, if any.
    pub fn typed_query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn ensure_launched(&self) -> Result<(), UiError> {
        if self.launched.is_some() {
            Ok(())
        } else {
            Err(UiError::Driver("browser is not running".to_string()))
        }
    }

    fn login_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/auth?client_id=datakwip-ui",
            self.site.auth_url.trim_end_matches('/'),
            self.site.realm
        )
    }

    fn open(&mut self, page: Page, url: String) {
        self.page = page;
        self.url = url;
        self.results_visible = false;
    }

    fn not_found(selector: &str) -> UiError {
        UiError::Driver(format!("element not found: {selector}"))
    }
}

impl BrowserDriver for StubBrowser {
    fn launch(&mut self, options: &LaunchOptions) -> Result<(), UiError> {
        self.launched = Some(options.clone());
        self.open(Page::Blank, "about:blank".to_string());
        Ok(())
    }

    fn goto(&mut self, url: &str) -> Result<(), UiError> {
        self.ensure_launched()?;
        if !url.starts_with(&self.site.app_url) {
            return Err(UiError::Driver(format!("net::ERR_NAME_NOT_RESOLVED at {url}")));
        }
        if !self.authenticated {
            let login = self.login_url();
            self.open(Page::Login, login);
        } else if url.to_lowercase().contains("data-explorer") {
            self.open(Page::DataExplorer, url.to_string());
        } else {
            self.open(Page::Dashboard, url.to_string());
        }
        Ok(())
    }

    fn wait_for_url(&mut self, pattern: &str, timeout: Duration) -> Result<(), UiError> {
        self.ensure_launched()?;
        if glob_matches(pattern, &self.url) {
            Ok(())
        } else {
            Err(UiError::Driver(format!(
                "timeout {}ms exceeded waiting for url {pattern}",
                timeout.as_millis()
            )))
        }
    }

    fn fill(&mut self, selector: &str, value: &str) -> Result<(), UiError> {
        self.ensure_launched()?;
        match (self.page, selector) {
            (Page::Login, USERNAME_INPUT) => value.clone_into(&mut self.typed_username),
            (Page::Login, PASSWORD_INPUT) => value.clone_into(&mut self.typed_password),
            (Page::DataExplorer, QUERY_INPUT) => self.query = Some(value.to_string()),
            _ => return Err(Self::not_found(selector)),
        }
        Ok(())
    }

    fn click(&mut self, selector: &str) -> Result<(), UiError> {
        self.ensure_launched()?;
        match (self.page, selector) {
            (Page::Login, SUBMIT_BUTTON) => {
                if self.typed_username == self.site.username
                    && self.typed_password == self.site.password
                {
                    self.authenticated = true;
                    let dashboard = format!("{}/dashboard", self.site.app_url);
                    self.open(Page::Dashboard, dashboard);
                } else {
                    let retry = format!("{}&error=invalid_credentials", self.login_url());
                    self.open(Page::Login, retry);
                }
            }
            (Page::Dashboard | Page::DataExplorer, DATA_EXPLORER_LINK) => {
                let explorer = format!("{}/data-explorer", self.site.app_url);
                self.open(Page::DataExplorer, explorer);
            }
            (Page::DataExplorer, EXECUTE_BUTTON) => self.results_visible = true,
            _ => return Err(Self::not_found(selector)),
        }
        Ok(())
    }

    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), UiError> {
        self.ensure_launched()?;
        let visible = match selector {
            USER_MENU => {
                self.authenticated && matches!(self.page, Page::Dashboard | Page::DataExplorer)
            }
            QUERY_RESULTS | RESULTS_COUNT => self.results_visible,
            _ => false,
        };
        if visible {
            Ok(())
        } else {
            Err(UiError::Driver(format!(
                "timeout {}ms exceeded waiting for selector {selector}",
                timeout.as_millis()
            )))
        }
    }

    fn wait_for_load_state(&mut self, _state: LoadState) -> Result<(), UiError> {
        self.ensure_launched()
    }

    fn text_content(&mut self, selector: &str) -> Result<Option<String>, UiError> {
        self.ensure_launched()?;
        if selector == RESULTS_COUNT && self.results_visible {
            return Ok(Some(format!("{} results", self.site.result_rows)));
        }
        Ok(None)
    }

    fn current_url(&mut self) -> Result<String, UiError> {
        self.ensure_launched()?;
        Ok(self.url.clone())
    }

    fn title(&mut self) -> Result<String, UiError> {
        self.ensure_launched()?;
        Ok(match self.page {
            Page::Blank => String::new(),
            Page::Login => "Sign in to DataKwip".to_string(),
            Page::Dashboard => "DataKwip".to_string(),
            Page::DataExplorer => "Data Explorer | DataKwip".to_string(),
        })
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), UiError> {
        self.ensure_launched()?;
        fs::write(path, PNG_SIGNATURE).map_err(|err| UiError::Driver(err.to_string()))?;
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), UiError> {
        self.launched = None;
        self.open(Page::Blank, "about:blank".to_string());
        Ok(())
    }
}

/// Matches Playwright-style URL globs where `*` and `**` match any run of characters.
fn glob_matches(pattern: &str, url: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let Some((first, rest)) = parts.split_first() else {
        return pattern == url;
    };
    let Some(mut remaining) = url.strip_prefix(first) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle.iter().filter(|part| !part.is_empty()) {
        match remaining.find(part) {
            Some(index) => remaining = &remaining[index + part.len() ..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}
