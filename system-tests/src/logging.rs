// system-tests/src/logging.rs
// ============================================================================
// Module: Harness Logging
// Description: One-time tracing subscriber installation.
// Purpose: Route client events to stderr or the test writer.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! Subscribers are installed once per process. `RUST_LOG` overrides the
//! default `info` filter.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Guards subscriber installation.
static INIT: Once = Once::new();

/// Builds the effective filter.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs a compact stderr subscriber for binaries.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

/// Installs a subscriber that writes through the test harness capture.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}
