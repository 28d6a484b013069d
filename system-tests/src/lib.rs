// system-tests/src/lib.rs
// ============================================================================
// Module: DataKwip System Tests Library
// Description: Shared configuration and logging for the functional harness.
// Purpose: Provide typed settings to the suites and the probe binary.
// Dependencies: datakwip-clients, tracing-subscriber
// ============================================================================

//! ## Overview
//! This crate hosts the configuration and logging setup used by the DataKwip
//! suites in `system-tests/tests` and by the `datakwip-probe` binary.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod logging;
