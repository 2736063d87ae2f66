//! Scheduler module running the uptime monitor loop.

use crate::alert::{AlertMessage, WebhookNotifier};
use crate::config::{MonitorConfig, ServiceConfig};
use crate::probe::{build_client, check_service, ProbeError};
use crate::store::{format_millis, CheckResult, CheckStatus, CycleLog, CycleRecord};

use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Future produced by a service check.
pub type CheckFuture = Pin<Box<dyn Future<Output = CheckResult> + Send>>;

type CheckFn = Arc<dyn Fn(Client, ServiceConfig) -> CheckFuture + Send + Sync>;

/// Lifecycle of a monitor: `Idle -> Running -> Stopped`. `Stopped` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

/// Monitor error types.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("check dispatch failed: {0}")]
    Dispatch(#[from] tokio::task::JoinError),
}

/// Polls every configured service on a fixed interval, logs each cycle and
/// alerts when services are down.
pub struct Monitor {
    services: Arc<Vec<ServiceConfig>>,
    interval: Duration,
    client: Client,
    check: CheckFn,
    log: CycleLog,
    notifier: Option<WebhookNotifier>,
    state: Arc<watch::Sender<MonitorState>>,
}

/// Cloneable controller for requesting a stop from another task.
#[derive(Clone)]
pub struct MonitorHandle {
    state: Arc<watch::Sender<MonitorState>>,
}

impl MonitorHandle {
    /// Request a stop. Takes effect once the in-flight cycle, if any, has
    /// completed. A stop requested before `run` keeps the monitor from
    /// ever starting.
    pub fn stop(&self) {
        let stopped = self.state.send_if_modified(|state| {
            if *state == MonitorState::Stopped {
                false
            } else {
                *state = MonitorState::Stopped;
                true
            }
        });

        if stopped {
            tracing::info!("Stopping uptime monitoring...");
        }
    }

    /// Stop the monitor on the first signal, then return on the second so
    /// the caller can exit without waiting for the in-flight cycle.
    pub async fn stop_on_signals<F, Fut>(&self, mut signal: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        signal().await;
        self.stop();
        signal().await;
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }
}

impl Monitor {
    /// Create a monitor for the given configuration.
    pub fn new(config: MonitorConfig) -> Result<Self, ProbeError> {
        let client = build_client()?;
        let notifier = config
            .alert_webhook
            .as_deref()
            .map(|url| WebhookNotifier::new(client.clone(), url));
        let (state, _) = watch::channel(MonitorState::Idle);

        Ok(Self {
            interval: config.interval_duration(),
            log: CycleLog::new(&config.log_file),
            services: Arc::new(config.services),
            client,
            check: Arc::new(|client: Client, service: ServiceConfig| -> CheckFuture {
                Box::pin(async move { check_service(&client, &service).await })
            }),
            notifier,
            state: Arc::new(state),
        })
    }

    /// Replace the HTTP check run for each service.
    pub fn with_check<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn(Client, ServiceConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CheckResult> + Send + 'static,
    {
        self.check = Arc::new(move |client: Client, service: ServiceConfig| -> CheckFuture {
            Box::pin(check(client, service))
        });
        self
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            state: self.state.clone(),
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Run poll cycles until a stop is requested.
    ///
    /// Returns immediately if the monitor is already running or has been
    /// stopped.
    pub async fn run(&self) {
        let mut previous = MonitorState::Idle;
        let started = self.state.send_if_modified(|state| {
            previous = *state;
            if *state == MonitorState::Idle {
                *state = MonitorState::Running;
                true
            } else {
                false
            }
        });

        if !started {
            match previous {
                MonitorState::Running => tracing::warn!("Uptime monitor is already running"),
                _ => tracing::info!("Uptime monitor was stopped before it started"),
            }
            return;
        }

        tracing::info!(
            "Starting uptime monitoring of {} services every {:?}",
            self.services.len(),
            self.interval
        );

        let mut state_rx = self.state.subscribe();

        loop {
            if *state_rx.borrow_and_update() != MonitorState::Running {
                break;
            }

            if let Err(e) = self.run_cycle().await {
                tracing::error!("Monitor error: {}", e);
            }

            // A stop request cuts the sleep short
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = state_rx.wait_for(|state| *state != MonitorState::Running) => {}
            }
        }

        tracing::info!("Uptime monitoring stopped");
    }

    /// Run one poll cycle: check every service concurrently, log the
    /// results and send at most one alert.
    ///
    /// Log and alert failures are reported and swallowed. Only a failed
    /// check task fails the cycle.
    pub async fn run_cycle(&self) -> Result<CycleRecord, MonitorError> {
        let handles: Vec<_> = self
            .services
            .iter()
            .map(|service| {
                let check = self.check.clone();
                tokio::spawn(check(self.client.clone(), service.clone()))
            })
            .collect();

        // Wait for every task before looking at any outcome
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await);
        }
        let results = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;

        let record = CycleRecord::new(results);
        report(&record);

        if let Err(e) = self.log.append(&record).await {
            tracing::error!("Failed to write uptime log: {}", e);
        }

        self.alert(&record).await;

        Ok(record)
    }

    async fn alert(&self, record: &CycleRecord) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let Some(message) = AlertMessage::for_down(record.down()) else {
            return;
        };

        match notifier.send(&message).await {
            Ok(()) => tracing::warn!("Alert sent: {} service(s) down", message.attachments.len()),
            Err(e) => tracing::error!("Failed to send alert: {}", e),
        }
    }
}

fn report(record: &CycleRecord) {
    tracing::info!("[{}] Health check completed", format_millis(&record.timestamp));
    for result in &record.results {
        let marker = match result.status {
            CheckStatus::Up => "✅",
            CheckStatus::Down => "❌",
        };
        tracing::info!(
            "  {} {}: {} ({}ms)",
            marker,
            result.name,
            result.status,
            result.response_time
        );
    }
}
