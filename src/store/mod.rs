//! Result storage for the uptime monitor.
//!
//! Check results are kept as newline-delimited JSON, one line per poll cycle.

mod cycle_log;
mod models;

pub use cycle_log::*;
pub use models::*;
