//! Configuration module for the uptime monitor and health prober.
//!
//! The monitor reads an optional JSON file named by `UPTIME_CONFIG`, falls
//! back to a built-in service list, and applies environment overrides on
//! top. The prober reads only `BACKEND_URL` and `FRONTEND_URL`.

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

const DEFAULT_SERVICE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_INTERVAL_MS: u64 = 60_000;
const DEFAULT_LOG_FILE: &str = "logs/uptime.log";
const PROBER_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A checkable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub name: String,
    pub url: String,
    /// Request timeout in milliseconds (default: 10000)
    #[serde(default = "default_service_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_service_timeout() -> u64 {
    DEFAULT_SERVICE_TIMEOUT_MS
}

impl ServiceConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            timeout: DEFAULT_SERVICE_TIMEOUT_MS,
            headers: BTreeMap::new(),
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "service with url {} has an empty name",
                self.url
            )));
        }
        validate_http_url(&self.url)
            .map_err(|e| ConfigError::Invalid(format!("service {}: {}", self.name, e)))?;
        if self.timeout == 0 {
            return Err(ConfigError::Invalid(format!(
                "service {}: timeout must be greater than zero",
                self.name
            )));
        }
        for (key, value) in &self.headers {
            if HeaderName::from_bytes(key.as_bytes()).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "service {}: invalid header name {:?}",
                    self.name, key
                )));
            }
            if HeaderValue::from_str(value).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "service {}: invalid value for header {}",
                    self.name, key
                )));
            }
        }
        Ok(())
    }
}

/// Uptime monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    /// Poll interval in milliseconds (default: 60000)
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Path of the NDJSON result log (default: "logs/uptime.log")
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Webhook receiving alerts when services are down
    #[serde(default)]
    pub alert_webhook: Option<String>,
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::builtin(DEFAULT_BACKEND_URL, DEFAULT_FRONTEND_URL)
    }
}

impl MonitorConfig {
    /// The built-in configuration: the backend health endpoint and the
    /// frontend root.
    pub fn builtin(backend_url: &str, frontend_url: &str) -> Self {
        Self {
            services: vec![
                ServiceConfig::new("Backend API", &health_url(backend_url)),
                ServiceConfig::new("Frontend", frontend_url),
            ],
            interval: DEFAULT_INTERVAL_MS,
            log_file: default_log_file(),
            alert_webhook: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPTIME_CONFIG`: JSON config file (default: built-in services)
    /// - `BACKEND_URL`, `FRONTEND_URL`: built-in service addresses
    /// - `UPTIME_INTERVAL_MS`: poll interval override
    /// - `UPTIME_LOG_FILE`: log file override
    /// - `SLACK_WEBHOOK_URL`: alert webhook override
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("UPTIME_CONFIG").filter(|p| !p.is_empty()) {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin(
                &lookup("BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
                &lookup("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            ),
        };

        if let Some(interval_str) = lookup("UPTIME_INTERVAL_MS") {
            if let Ok(interval) = interval_str.parse() {
                cfg.interval = interval;
            }
        }

        if let Some(log_file) = lookup("UPTIME_LOG_FILE").filter(|p| !p.is_empty()) {
            cfg.log_file = PathBuf::from(log_file);
        }

        if let Some(webhook) = lookup("SLACK_WEBHOOK_URL") {
            cfg.alert_webhook = Some(webhook).filter(|w| !w.is_empty());
        }

        Ok(cfg)
    }

    /// Parse a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    /// Check the configuration before the monitor starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::Invalid("no services configured".to_string()));
        }
        if self.interval == 0 {
            return Err(ConfigError::Invalid(
                "interval must be greater than zero".to_string(),
            ));
        }
        for service in &self.services {
            service.validate()?;
        }
        if let Some(webhook) = &self.alert_webhook {
            validate_http_url(webhook)
                .map_err(|e| ConfigError::Invalid(format!("alert webhook: {}", e)))?;
        }
        Ok(())
    }
}

/// Health prober configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProberConfig {
    pub backend_url: String,
    pub frontend_url: String,
    /// Per-target timeout (5 seconds)
    pub timeout: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            timeout: PROBER_TIMEOUT,
        }
    }
}

impl ProberConfig {
    /// Load configuration from `BACKEND_URL` and `FRONTEND_URL`.
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(url) = env::var("BACKEND_URL") {
            cfg.backend_url = url;
        }

        if let Ok(url) = env::var("FRONTEND_URL") {
            cfg.frontend_url = url;
        }

        cfg
    }

    pub fn backend_health_url(&self) -> String {
        health_url(&self.backend_url)
    }
}

/// Append `/health` to a base URL without doubling the slash.
pub fn health_url(base: &str) -> String {
    format!("{}/health", base.trim_end_matches('/'))
}

fn validate_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid url {:?}: {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme {:?} in {}", other, raw)),
    }
}
