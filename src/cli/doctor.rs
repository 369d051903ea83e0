//! `formo-sync doctor` - active health diagnostics.
//!
//! Validates configuration, runs one lifecycle against the local console
//! client and probes the RPC endpoint for the default network. Each check
//! reports pass/fail with actionable guidance on failures.

use std::path::Path;
use std::sync::Arc;

use crate::analytics::ConsoleAnalytics;
use crate::config::{Config, WRITE_KEY_ENV};
use crate::event_log::EventLog;
use crate::health::{self, DEFAULT_PROBE_TIMEOUT};
use crate::lifecycle::{AnalyticsController, ControllerInputs, StatusIndicator};
use crate::network::NetworkSelection;
use crate::settings::Settings;
use crate::wallet::WalletFeed;

/// Run diagnostic checks and print results.
pub async fn run_doctor_command(config_path: Option<&Path>, strict: bool) -> anyhow::Result<()> {
    println!("Formo Sync Doctor");
    println!("=================\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    check(
        "Env file",
        check_env_file(),
        &mut passed,
        &mut failed,
    );

    check(
        "Config file",
        check_config_file(config_path),
        &mut passed,
        &mut failed,
    );

    let config = Config::from_env_with_toml(config_path).map_err(|e| e.to_string());

    check(
        "Formo write key",
        check_write_key(&config),
        &mut passed,
        &mut failed,
    );

    check(
        "Network",
        check_network(&config),
        &mut passed,
        &mut failed,
    );

    check(
        "Analytics lifecycle",
        check_lifecycle(&config).await,
        &mut passed,
        &mut failed,
    );

    check(
        "RPC reachability",
        check_rpc_reachability(&config).await,
        &mut passed,
        &mut failed,
    );

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Some checks failed. Analytics stays disabled until they pass.");
        if strict {
            anyhow::bail!("doctor strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_env_file() -> CheckResult {
    let path = crate::bootstrap::formo_env_path();
    if path.exists() {
        CheckResult::Pass(format!("found {}", path.display()))
    } else {
        CheckResult::Skip(format!("{} not present", path.display()))
    }
}

fn check_config_file(explicit: Option<&Path>) -> CheckResult {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_toml_path);
    match Settings::load_toml(&path) {
        Ok(Some(_)) => CheckResult::Pass(format!("loaded {}", path.display())),
        Ok(None) if explicit.is_some() => {
            CheckResult::Fail(format!("{} does not exist", path.display()))
        }
        Ok(None) => CheckResult::Skip(format!("{} not present", path.display())),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

fn check_write_key(config: &Result<Config, String>) -> CheckResult {
    let config = match config {
        Ok(config) => config,
        Err(e) => return CheckResult::Fail(e.clone()),
    };
    match &config.analytics.write_key {
        Some(key) => CheckResult::Pass(format!("configured (fingerprint {})", key.fingerprint())),
        None => CheckResult::Fail(format!(
            "not set. Export {WRITE_KEY_ENV} or add write_key to {}",
            Settings::default_toml_path().display()
        )),
    }
}

fn check_network(config: &Result<Config, String>) -> CheckResult {
    let config = match config {
        Ok(config) => config,
        Err(e) => return CheckResult::Fail(e.clone()),
    };
    let network = config.network.default_network;
    let endpoint = config.network.endpoints().endpoint_for(network);
    let source = if config.network.custom_rpc_url.is_some() {
        "custom"
    } else {
        "public"
    };
    CheckResult::Pass(format!("{network} via {source} endpoint {endpoint}"))
}

/// Drive one controller through init and disposal with the console client.
async fn check_lifecycle(config: &Result<Config, String>) -> CheckResult {
    let config = match config {
        Ok(config) => config,
        Err(_) => return CheckResult::Skip("configuration did not load".to_string()),
    };
    if config.analytics.write_key.is_none() {
        return CheckResult::Skip("no write key".to_string());
    }

    let network = NetworkSelection::new(config.network.default_network);
    let wallet = WalletFeed::default();
    let controller = AnalyticsController::spawn(
        Arc::new(ConsoleAnalytics::default()),
        ControllerInputs {
            write_key: config.analytics.write_key.clone(),
            endpoints: config.network.endpoints(),
            network: network.subscribe(),
            wallet: wallet.subscribe(),
            event_log: Arc::new(EventLog::new()),
        },
    );
    controller.flush().await;

    let status = controller.status();
    let events = controller.event_log_entries().len();
    controller.shutdown().await;

    match status {
        StatusIndicator::Active => {
            CheckResult::Pass(format!("client initialized and disposed ({events} log entries)"))
        }
        other => CheckResult::Fail(format!("controller ended in '{other}'")),
    }
}

async fn check_rpc_reachability(config: &Result<Config, String>) -> CheckResult {
    let config = match config {
        Ok(config) => config,
        Err(_) => return CheckResult::Skip("configuration did not load".to_string()),
    };
    let network = config.network.default_network;
    let url = config.network.endpoints().endpoint_for(network);
    let health = health::probe_endpoint(network, &url, DEFAULT_PROBE_TIMEOUT).await;

    if health.is_healthy() {
        CheckResult::Pass(format!("{url} reports {}", health.detail))
    } else {
        CheckResult::Fail(format!(
            "{url} {} ({})",
            health.state.as_str(),
            health.detail
        ))
    }
}

#[cfg(test)]
fn format_result(r: &CheckResult) -> String {
    match r {
        CheckResult::Pass(s) => format!("Pass({s})"),
        CheckResult::Fail(s) => format!("Fail({s})"),
        CheckResult::Skip(s) => format!("Skip({s})"),
    }
}
