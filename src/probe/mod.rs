//! Probe module for uptime monitoring.
//!
//! Provides the per-service HTTP check used by the monitor loop and the
//! one-shot backend/frontend health check.

mod health;
mod http;

pub use health::*;
pub use http::*;

use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
