// crates/datakwip-clients/src/browser.rs
// ============================================================================
// Module: Playwright CLI Driver
// Description: Subprocess-backed browser engine for the UI client.
// Purpose: Delegate browser control to an external Playwright executable.
// Dependencies: serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`PlaywrightCliDriver`] runs one process per action:
//! `<cli> [args..] <subcommand> [json-payload]`. Subcommands are
//! `start-session`, `execute-action`, and `shutdown-session`. Each reply is a
//! single JSON object `{status_code, error_code?, value?}` on stdout.
//! Invariants:
//! - A non-zero exit or `status_code >= 400` is a [`UiError::Driver`].
//! - A reply without a non-zero `status_code` is rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

use crate::ui::BrowserDriver;
use crate::ui::LaunchOptions;
use crate::ui::LoadState;
use crate::ui::UiError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Subcommand that opens the browser session.
const START_SESSION: &str = "start-session";
/// Subcommand that runs one page action.
const EXECUTE_ACTION: &str = "execute-action";
/// Subcommand that closes the browser session.
const SHUTDOWN_SESSION: &str = "shutdown-session";
/// Lowest status code treated as a failure.
const FAILURE_STATUS: u16 = 400;

// ============================================================================
// SECTION: Reply
// ============================================================================

/// Reply printed by the driver executable.
#[derive(Debug, Deserialize)]
struct DriverReply {
    /// HTTP-style status code; 0 means missing.
    #[serde(default)]
    status_code: u16,
    /// Machine-readable failure code.
    #[serde(default)]
    error_code: Option<String>,
    /// Action result value.
    #[serde(default)]
    value: Option<Value>,
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Browser engine backed by an external Playwright command.
#[derive(Debug, Clone)]
pub struct PlaywrightCliDriver {
    /// Executable to run.
    program: String,
    /// Arguments placed before the subcommand.
    args: Vec<String>,
}

impl PlaywrightCliDriver {
    /// Creates a driver for `program`.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::Driver`] when the program path is empty.
    pub fn new(program: impl Into<String>) -> Result<Self, UiError> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(UiError::Driver("browser driver cli path cannot be empty".to_string()));
        }
        Ok(Self {
            program,
            args: Vec::new(),
        })
    }

    /// Parses a whitespace-separated command line such as `node driver.js`.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::Driver`] when the command line is empty.
    pub fn from_command_line(command_line: &str) -> Result<Self, UiError> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().unwrap_or_default();
        Ok(Self::new(program)?.with_args(parts.map(str::to_string)))
    }

    /// Appends arguments placed before every subcommand.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Runs one subcommand and validates the reply.
    fn invoke(&self, subcommand: &str, payload: Option<&Value>) -> Result<Option<Value>, UiError> {
        let mut command = Command::new(self.program.trim());
        command.args(&self.args).arg(subcommand);
        if let Some(payload) = payload {
            let encoded = serde_json::to_string(payload)
                .map_err(|err| UiError::Driver(format!("serialize driver payload: {err}")))?;
            command.arg(encoded);
        }
        debug!(program = %self.program, subcommand, "invoking browser driver");
        let output = command.output().map_err(|err| {
            UiError::Driver(format!("failed to launch browser driver '{}': {err}", self.program))
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if !stderr.is_empty() {
                stderr
            } else if !stdout.is_empty() {
                stdout
            } else {
                "no output".to_string()
            };
            return Err(UiError::Driver(format!(
                "driver subcommand '{subcommand}' failed: {detail}"
            )));
        }
        if stdout.is_empty() {
            return Err(UiError::Driver(format!("driver returned empty response for {subcommand}")));
        }
        let reply: DriverReply = serde_json::from_str(&stdout)
            .map_err(|err| UiError::Driver(format!("invalid driver response {stdout}: {err}")))?;
        if reply.status_code == 0 {
            return Err(UiError::Driver(
                "driver response is missing non-zero status_code".to_string(),
            ));
        }
        if reply.status_code >= FAILURE_STATUS {
            let code = reply.error_code.unwrap_or_else(|| "unknown".to_string());
            return Err(UiError::Driver(format!(
                "{subcommand} returned status {} ({code})",
                reply.status_code
            )));
        }
        Ok(reply.value)
    }

    /// Runs one `execute-action` call.
    fn action(&self, payload: &Value) -> Result<Option<Value>, UiError> {
        self.invoke(EXECUTE_ACTION, Some(payload))
    }

    /// Runs an action whose reply value must be a string.
    fn string_action(&self, payload: &Value) -> Result<String, UiError> {
        match self.action(payload)? {
            Some(Value::String(text)) => Ok(text),
            Some(other) => Err(UiError::Driver(format!("expected string value, got {other}"))),
            None => Err(UiError::Driver("expected string value, got nothing".to_string())),
        }
    }
}

/// Converts a timeout to whole milliseconds for the driver payload.
fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

impl BrowserDriver for PlaywrightCliDriver {
    fn launch(&mut self, options: &LaunchOptions) -> Result<(), UiError> {
        let payload = json!({
            "browser": options.browser.as_str(),
            "headless": options.headless,
            "viewport": {"width": options.viewport_width, "height": options.viewport_height},
            "ignore_https_errors": options.ignore_https_errors,
            "timeout_ms": millis(options.default_timeout),
        });
        self.invoke(START_SESSION, Some(&payload)).map(drop)
    }

    fn goto(&mut self, url: &str) -> Result<(), UiError> {
        self.action(&json!({"action": "goto", "url": url})).map(drop)
    }

    fn wait_for_url(&mut self, pattern: &str, timeout: Duration) -> Result<(), UiError> {
        self.action(&json!({
            "action": "wait_for_url",
            "pattern": pattern,
            "timeout_ms": millis(timeout),
        }))
            .map(drop)
    }

    fn fill(&mut self, selector: &str, value: &str) -> Result<(), UiError> {
        self.action(&json!({"action": "fill", "selector": selector, "text": value})).map(drop)
    }

    fn click(&mut self, selector: &str) -> Result<(), UiError> {
        self.action(&json!({"action": "click", "selector": selector})).map(drop)
    }

    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), UiError> {
        self.action(&json!({
            "action": "wait_for_selector",
            "selector": selector,
            "timeout_ms": millis(timeout),
        }))
        .map(drop)
    }

    fn wait_for_load_state(&mut self, state: LoadState) -> Result<(), UiError> {
        self.action(&json!({"action": "wait_for_load_state", "state": state.as_str()})).map(drop)
    }

    fn text_content(&mut self, selector: &str) -> Result<Option<String>, UiError> {
        match self.action(&json!({"action": "text_content", "selector": selector}))? {
            Some(Value::String(text)) => Ok(Some(text)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(UiError::Driver(format!("expected text value, got {other}"))),
        }
    }

    fn current_url(&mut self) -> Result<String, UiError> {
        self.string_action(&json!({"action": "url"}))
    }

    fn title(&mut self) -> Result<String, UiError> {
        self.string_action(&json!({"action": "title"}))
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), UiError> {
        self.action(&json!({"action": "screenshot", "path": path.to_string_lossy()})).map(drop)
    }

    fn shutdown(&mut self) -> Result<(), UiError> {
        self.invoke(SHUTDOWN_SESSION, None).map(drop)
    }
}
