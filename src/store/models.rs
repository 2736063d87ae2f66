//! Check result model types.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::config::ServiceConfig;

/// Outcome of probing a single service once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Up,
    Down,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Up => f.write_str("up"),
            CheckStatus::Down => f.write_str("down"),
        }
    }
}

/// The immutable record of one service check.
///
/// Exactly one of `status_code` and `error` is set: a service that answered
/// carries its status code, a service that could not be reached carries the
/// error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: String,
    pub url: String,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Elapsed time in milliseconds
    pub response_time: u64,
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    /// Build a result for a service that answered with `status_code`.
    ///
    /// Any 2xx code counts as up.
    pub fn answered(service: &ServiceConfig, status_code: u16, elapsed: Duration) -> Self {
        let status = if (200..300).contains(&status_code) {
            CheckStatus::Up
        } else {
            CheckStatus::Down
        };

        Self {
            name: service.name.clone(),
            url: service.url.clone(),
            status,
            status_code: Some(status_code),
            error: None,
            response_time: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    /// Build a result for a service that could not be reached.
    pub fn failed(service: &ServiceConfig, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            name: service.name.clone(),
            url: service.url.clone(),
            status: CheckStatus::Down,
            status_code: None,
            error: Some(error.into()),
            response_time: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    pub fn is_down(&self) -> bool {
        self.status == CheckStatus::Down
    }

    /// Human readable failure detail, used in alerts.
    pub fn failure_detail(&self) -> String {
        match (&self.error, self.status_code) {
            (Some(err), _) => err.clone(),
            (None, Some(code)) => format!("HTTP {}", code),
            (None, None) => "Unknown".to_string(),
        }
    }
}

/// All results of one poll cycle, written to the log as a single line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
    pub results: Vec<CheckResult>,
}

impl CycleRecord {
    pub fn new(results: Vec<CheckResult>) -> Self {
        Self {
            timestamp: Utc::now(),
            results,
        }
    }

    /// Results with status `down`, in configuration order.
    pub fn down(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| r.is_down()).collect()
    }
}

/// Serialize a timestamp as ISO-8601 UTC with millisecond precision,
/// e.g. `2024-01-01T12:34:56.789Z`.
pub fn serialize_millis<S: Serializer>(time: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_millis(time))
}

pub fn format_millis(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn service() -> ServiceConfig {
        ServiceConfig::new("API", "http://localhost:5000/health")
    }

    #[test]
    fn test_answered_classification() {
        let ok = CheckResult::answered(&service(), 200, Duration::from_millis(12));
        assert_eq!(ok.status, CheckStatus::Up);
        assert_eq!(ok.status_code, Some(200));
        assert!(ok.error.is_none());
        assert_eq!(ok.response_time, 12);

        let no_content = CheckResult::answered(&service(), 204, Duration::ZERO);
        assert_eq!(no_content.status, CheckStatus::Up);

        let redirect = CheckResult::answered(&service(), 304, Duration::ZERO);
        assert_eq!(redirect.status, CheckStatus::Down);

        let broken = CheckResult::answered(&service(), 500, Duration::ZERO);
        assert_eq!(broken.status, CheckStatus::Down);
        assert!(broken.error.is_none());
    }

    #[test]
    fn test_failed_carries_error_only() {
        let result = CheckResult::failed(&service(), "connection refused", Duration::from_millis(3));
        assert_eq!(result.status, CheckStatus::Down);
        assert_eq!(result.status_code, None);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_failure_detail() {
        let failed = CheckResult::failed(&service(), "timed out", Duration::ZERO);
        assert_eq!(failed.failure_detail(), "timed out");

        let answered = CheckResult::answered(&service(), 503, Duration::ZERO);
        assert_eq!(answered.failure_detail(), "HTTP 503");

        let mut odd = answered.clone();
        odd.status_code = None;
        assert_eq!(odd.failure_detail(), "Unknown");
    }

    #[test]
    fn test_result_json_shape() {
        let mut result = CheckResult::answered(&service(), 500, Duration::from_millis(42));
        result.timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 34, 56).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["name"], "API");
        assert_eq!(json["status"], "down");
        assert_eq!(json["statusCode"], 500);
        assert_eq!(json["responseTime"], 42);
        assert_eq!(json["timestamp"], "2024-01-01T12:34:56.000Z");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_cycle_down_filter() {
        let record = CycleRecord::new(vec![
            CheckResult::answered(&service(), 200, Duration::ZERO),
            CheckResult::failed(&ServiceConfig::new("B", "http://b"), "refused", Duration::ZERO),
            CheckResult::answered(&ServiceConfig::new("C", "http://c"), 502, Duration::ZERO),
        ]);

        let down: Vec<&str> = record.down().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(down, vec!["B", "C"]);
    }
}
