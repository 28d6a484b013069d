// system-tests/src/config/mod.rs
// ============================================================================
// Module: Harness Configuration
// Description: Centralized configuration for the DataKwip harness.
// Purpose: Provide typed access to endpoints, credentials, and defaults.
// Dependencies: datakwip-clients
// ============================================================================

//! ## Overview
//! Harness configuration is read from `DATAKWIP_*` environment variables and
//! an optional dotenv file, then mapped into a [`HarnessConfig`]. A complete
//! configuration resolves to a [`PlatformTarget`] that builds every client.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod dotenv;
mod env;
mod target;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use dotenv::DOTENV_EXAMPLE_FILE;
pub use dotenv::DOTENV_FILE;
pub use dotenv::DotenvFile;
pub use dotenv::parse_dotenv;
pub use env::DEFAULT_REALM;
pub use env::HarnessConfig;
pub use env::HarnessEnv;
pub use env::read_env_strict;
pub use target::PlatformCredentials;
pub use target::PlatformEndpoints;
pub use target::PlatformTarget;
pub use target::TestSettings;
