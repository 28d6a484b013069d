// system-tests/src/bin/datakwip_probe.rs
// ============================================================================
// Module: DataKwip Probe
// Description: Diagnostic commands against a configured DataKwip deployment.
// Purpose: Inspect health, realm registrations, and users without the suites.
// Dependencies: clap, datakwip-clients, system-tests
// ============================================================================

//! ## Overview
//! `datakwip-probe` loads the harness configuration (environment plus
//! `.env`) and runs one read-only diagnostic:
//! - `health`: database health from the REST API.
//! - `realm`: first clients and users of the realm, plus whether the harness
//!   client and test user are registered.
//! - `user <fragment>`: users whose username or email contains the fragment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use datakwip_clients::ApiClient;
use datakwip_clients::RealmAdminClient;
use datakwip_clients::admin::DEFAULT_USER_PAGE;
use system_tests::config::HarnessConfig;
use system_tests::config::HarnessEnv;
use system_tests::config::PlatformTarget;
use system_tests::logging::init_logging;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Entries shown per listing in `realm`.
const REALM_PREVIEW: usize = 10;

// ============================================================================
// SECTION: CLI
// ============================================================================

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "datakwip-probe", about = "Read-only diagnostics for a DataKwip deployment")]
struct Cli {
    /// Diagnostic to run.
    #[command(subcommand)]
    command: Command,
}

/// Diagnostics.
#[derive(Subcommand, Debug)]
enum Command {
    /// Print database health reported by the API.
    Health,
    /// Summarize realm clients and users.
    Realm,
    /// Find users by username or email fragment.
    User {
        /// Case-insensitive fragment to match.
        fragment: String,
        /// Maximum users to scan.
        #[arg(long, default_value_t = DEFAULT_USER_PAGE)]
        max: u32,
    },
}

/// Probe result type; errors are rendered to stderr.
type ProbeResult<T> = Result<T, String>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "datakwip-probe: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration and dispatches the chosen diagnostic.
fn run() -> ProbeResult<()> {
    let cli = Cli::parse();
    let config = HarnessConfig::load()?;
    let target = live_target(&config)?;
    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Health => command_health(&target, &mut out),
        Command::Realm => command_realm(&target, &mut out),
        Command::User {
            fragment,
            max,
        } => command_user(&target, &fragment, max, &mut out),
    }
}

/// Resolves the live target or names the missing keys.
fn live_target(config: &HarnessConfig) -> ProbeResult<PlatformTarget> {
    config.live_target().ok_or_else(|| {
        let missing: Vec<&str> =
            config.missing_live_keys().into_iter().map(HarnessEnv::as_str).collect();
        format!("deployment not configured; missing {}", missing.join(", "))
    })
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Prints database health.
fn command_health(target: &PlatformTarget, out: &mut impl Write) -> ProbeResult<()> {
    let client = ApiClient::new(&target.api_config()).map_err(|err| err.to_string())?;
    let health = client.get_database_health().map_err(|err| err.to_string())?;
    if health.is_empty() {
        return write_line(out, "no databases reported");
    }
    for name in health.names() {
        let status = health.database(name);
        let state =
            status.as_ref().and_then(|db| db.status.clone()).unwrap_or_else(|| "unknown".into());
        let latency = status
            .and_then(|db| db.latency_ms)
            .map_or_else(String::new, |ms| format!(" ({ms:.1} ms)"));
        write_line(out, &format!("{name}: {state}{latency}"))?;
    }
    client.close();
    Ok(())
}

/// Prints realm clients and users.
fn command_realm(target: &PlatformTarget, out: &mut impl Write) -> ProbeResult<()> {
    let mut admin = connect_admin(target)?;
    write_line(out, &format!("realm: {}", admin.realm()))?;

    let clients = admin.list_clients().map_err(|err| err.to_string())?;
    write_line(out, &format!("clients: {}", clients.len()))?;
    for client in clients.iter().take(REALM_PREVIEW) {
        write_line(out, &format!("  - {}", client.client_id))?;
    }
    let has_client = clients.iter().any(|client| client.client_id == target.credentials.client_id);
    write_line(out, &found_line(&target.credentials.client_id, has_client))?;

    let users = admin
        .list_users(u32::try_from(REALM_PREVIEW).unwrap_or(u32::MAX))
        .map_err(|err| err.to_string())?;
    write_line(out, &format!("users: {}", users.len()))?;
    for user in &users {
        let email = user.email.as_deref().unwrap_or("N/A");
        write_line(out, &format!("  - {} <{email}>", user.username))?;
    }
    let has_user = admin
        .verify_user_exists(&target.credentials.user_email)
        .map_err(|err| err.to_string())?;
    write_line(out, &found_line(&target.credentials.user_email, has_user))?;
    admin.close();
    Ok(())
}

/// Prints users matching `fragment`.
fn command_user(
    target: &PlatformTarget,
    fragment: &str,
    max: u32,
    out: &mut impl Write,
) -> ProbeResult<()> {
    let mut admin = connect_admin(target)?;
    let users = admin.find_users_matching(fragment, max).map_err(|err| err.to_string())?;
    if users.is_empty() {
        write_line(out, &format!("no users match '{fragment}'"))?;
    }
    for user in users {
        write_line(out, &format!("username: {}", user.username))?;
        write_line(out, &format!("email: {}", user.email.as_deref().unwrap_or("N/A")))?;
        write_line(out, &format!("id: {}", user.id.as_deref().unwrap_or("N/A")))?;
        let enabled = user.enabled.map_or_else(|| "unknown".to_string(), |flag| flag.to_string());
        write_line(out, &format!("enabled: {enabled}"))?;
    }
    admin.close();
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds and connects the admin client.
fn connect_admin(target: &PlatformTarget) -> ProbeResult<RealmAdminClient> {
    let mut admin = RealmAdminClient::new(target.admin_config()).map_err(|err| err.to_string())?;
    admin.connect().map_err(|err| err.to_string())?;
    Ok(admin)
}

/// Formats a found / not-found marker.
fn found_line(name: &str, found: bool) -> String {
    if found { format!("FOUND {name}") } else { format!("NOT FOUND {name}") }
}

/// Writes one line to `out`.
fn write_line(out: &mut impl Write, line: &str) -> ProbeResult<()> {
    writeln!(out, "{line}").map_err(|err| format!("stdout write failed: {err}"))
}
