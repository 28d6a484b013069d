// system-tests/tests/helpers/timeouts.rs
// ============================================================================
// Module: System Test Timeouts
// Description: Centralized readiness and latency budgets with env overrides.
// Purpose: Keep suite budgets consistent and stretchable on slow deployments.
// ============================================================================

use std::env;
use std::time::Duration;

const ENV_TIMEOUT_SECS: &str = "DATAKWIP_SYSTEM_TEST_TIMEOUT_SEC";

/// Health endpoint latency budget.
pub const HEALTH_BUDGET: Duration = Duration::from_secs(1);
/// Entity listing latency budget.
pub const ENTITY_LIST_BUDGET: Duration = Duration::from_millis(500);
/// Tag listing latency budget.
pub const TAG_LIST_BUDGET: Duration = Duration::from_millis(800);
/// MCP tool listing budget.
pub const TOOL_LIST_BUDGET: Duration = Duration::from_secs(1);
/// Average request budget for the sequential stress run.
pub const STRESS_AVERAGE_BUDGET: Duration = Duration::from_secs(1);
/// Readiness wait for a freshly started deployment.
pub const READINESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns the effective budget, honoring `DATAKWIP_SYSTEM_TEST_TIMEOUT_SEC` when set.
/// The override acts as a minimum so explicitly longer budgets are kept.
pub fn resolve_timeout(requested: Duration) -> Result<Duration, String> {
    match env::var(ENV_TIMEOUT_SECS) {
        Ok(raw) => {
            let override_timeout =
                parse_timeout_secs(&raw).map_err(|err| format!("{ENV_TIMEOUT_SECS} {err}"))?;
            Ok(std::cmp::max(requested, override_timeout))
        }
        Err(_) => Ok(requested),
    }
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("must be a positive integer number of seconds".to_string());
    }
    let secs: u64 =
        trimmed.parse().map_err(|_| "must be a positive integer number of seconds".to_string())?;
    if secs == 0 {
        return Err("must be greater than zero".to_string());
    }
    Ok(Duration::from_secs(secs))
}
