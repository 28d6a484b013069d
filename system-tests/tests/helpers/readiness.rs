// system-tests/tests/helpers/readiness.rs
// ============================================================================
// Module: Readiness Helpers
// Description: Readiness probes for DataKwip deployments.
// Purpose: Ensure the platform answers before suites start, without fixed sleeps.
// Dependencies: datakwip-clients
// ============================================================================

use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use datakwip_clients::ApiClient;

/// Polls the database health endpoint until it answers or `timeout` expires.
pub fn wait_for_api_ready(client: &ApiClient, timeout: Duration) -> Result<(), String> {
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match client.get_database_health() {
            Ok(_) => return Ok(()),
            Err(err) => {
                if start.elapsed() > timeout {
                    return Err(format!("api readiness timeout after {attempts} attempts: {err}"));
                }
                sleep(Duration::from_millis(50));
            }
        }
    }
}
