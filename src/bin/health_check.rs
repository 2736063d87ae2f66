//! One-shot health check of the backend and frontend.
//!
//! Prints a JSON report to stdout and exits non-zero unless both are healthy.

use uptime_monitor::config::ProberConfig;
use uptime_monitor::probe::check_health;

use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr, stdout carries only the report
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cfg = ProberConfig::load();

    let report = match check_health(&cfg).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::error!("Failed to encode health report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if report.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
