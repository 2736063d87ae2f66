//! Uptime monitor: polls the configured services until interrupted.

use uptime_monitor::config::MonitorConfig;
use uptime_monitor::scheduler::Monitor;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("uptime_monitor=info".parse()?))
        .init();

    // Load configuration
    let cfg = MonitorConfig::load()?;
    cfg.validate()?;
    tracing::info!("Logging results to {}", cfg.log_file.display());
    if cfg.alert_webhook.is_none() {
        tracing::info!("No alert webhook configured, alerts are disabled");
    }

    let monitor = Monitor::new(cfg)?;
    let handle = monitor.handle();
    tokio::spawn(async move {
        handle.stop_on_signals(shutdown_signal).await;
        tracing::warn!("Second shutdown signal received, exiting without finishing the cycle");
        std::process::exit(130);
    });

    monitor.run().await;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
