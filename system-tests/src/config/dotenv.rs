// system-tests/src/config/dotenv.rs
// ============================================================================
// Module: Dotenv Files
// Description: Minimal `KEY=value` file reader for harness settings.
// Purpose: Let local runs keep endpoints and credentials out of the shell.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! Reads `.env`, falling back to `.env.example`. Lines are `KEY=value` with
//! optional `export ` prefixes, `#` comments, and matching single or double
//! quotes around the value. Malformed lines fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Primary settings file name.
pub const DOTENV_FILE: &str = ".env";
/// Fallback settings file name.
pub const DOTENV_EXAMPLE_FILE: &str = ".env.example";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parsed settings file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DotenvFile {
    /// File the values came from.
    pub path: PathBuf,
    /// Parsed key/value pairs.
    pub values: BTreeMap<String, String>,
}

impl DotenvFile {
    /// Loads `.env` from `dir`, or `.env.example` when `.env` is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when a file exists but cannot be read or parsed.
    pub fn discover(dir: &Path) -> Result<Option<Self>, String> {
        if let Some(file) = Self::read(&dir.join(DOTENV_FILE))? {
            return Ok(Some(file));
        }
        let fallback = Self::read(&dir.join(DOTENV_EXAMPLE_FILE))?;
        if let Some(file) = &fallback {
            warn!(
                path = %file.path.display(),
                "{DOTENV_FILE} not found, loading {DOTENV_EXAMPLE_FILE}"
            );
        }
        Ok(fallback)
    }

    /// Reads one file; a missing file is `Ok(None)`.
    fn read(path: &Path) -> Result<Option<Self>, String> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(format!("{}: {err}", path.display())),
        };
        let values = parse_dotenv(&text).map_err(|err| format!("{}: {err}", path.display()))?;
        Ok(Some(Self {
            path: path.to_path_buf(),
            values,
        }))
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses dotenv text; later duplicates win.
///
/// # Errors
///
/// Returns an error naming the first malformed line.
pub fn parse_dotenv(text: &str) -> Result<BTreeMap<String, String>, String> {
    let mut values = BTreeMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map_or(line, str::trim_start);
        let line_no = index + 1;
        let Some((key, value)) = line.split_once('=') else {
            return Err(format!("line {line_no}: expected KEY=value"));
        };
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(format!("line {line_no}: invalid key '{key}'"));
        }
        values.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    Ok(values)
}

/// Strips one pair of matching quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}
