//! Uptime monitoring for a web application.
//!
//! Two tools share this library: a one-shot health prober for deployment
//! gating, and a long-running monitor that polls a list of services, keeps
//! an NDJSON log of every cycle and alerts a webhook when services go down.

pub mod alert;
pub mod config;
pub mod probe;
pub mod scheduler;
pub mod store;
