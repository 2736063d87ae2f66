//! One-shot health check of the backend API and the frontend.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::{build_client, fetch, ProbeError};
use crate::config::ProberConfig;
use crate::store::serialize_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health of one probed target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHealth {
    pub status: HealthStatus,
    /// Elapsed time in milliseconds
    pub response_time: u64,
    /// The backend's self-reported payload, on any 2xx answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Result of one health check round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
    pub backend: TargetHealth,
    pub frontend: TargetHealth,
}

impl HealthReport {
    /// True only if both targets are healthy.
    pub fn is_healthy(&self) -> bool {
        self.backend.is_healthy() && self.frontend.is_healthy()
    }
}

/// Check the backend health endpoint and the frontend once each.
///
/// Both checks run concurrently; a failure on one target never aborts the
/// other. Only a failure to build the HTTP client is an error.
pub async fn check_health(config: &ProberConfig) -> Result<HealthReport, ProbeError> {
    let client = build_client()?;
    let timestamp = Utc::now();

    let backend_url = config.backend_health_url();
    let (backend, frontend) = tokio::join!(
        probe_target(&client, &backend_url, config.timeout, true),
        probe_target(&client, &config.frontend_url, config.timeout, false),
    );

    Ok(HealthReport {
        timestamp,
        backend,
        frontend,
    })
}

async fn probe_target(client: &Client, url: &str, timeout: Duration, keep_body: bool) -> TargetHealth {
    let start = Instant::now();
    let result = fetch(client, url, timeout, &BTreeMap::new()).await;
    let response_time = start.elapsed().as_millis() as u64;

    match result {
        Ok(response) if response.status == 200 => TargetHealth {
            status: HealthStatus::Healthy,
            response_time,
            data: keep_body.then(|| body_value(response.body)),
            error: None,
        },
        // Other 2xx answers are unhealthy but carry no error
        Ok(response) if (200..300).contains(&response.status) => TargetHealth {
            status: HealthStatus::Unhealthy,
            response_time,
            data: keep_body.then(|| body_value(response.body)),
            error: None,
        },
        Ok(response) => TargetHealth {
            status: HealthStatus::Unhealthy,
            response_time,
            data: None,
            error: Some(format!("unexpected status code {}", response.status)),
        },
        Err(e) => {
            tracing::warn!("Health check failed for {}: {}", url, e);
            TargetHealth {
                status: HealthStatus::Unhealthy,
                response_time,
                data: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Parse a body as JSON, falling back to the raw text.
fn body_value(body: String) -> Value {
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(backend: String, frontend: String) -> ProberConfig {
        ProberConfig {
            backend_url: backend,
            frontend_url: frontend,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_both_healthy() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "db": "connected"})))
            .expect(1)
            .mount(&backend)
            .await;

        let frontend = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&frontend)
            .await;

        let report = check_health(&config(backend.uri(), frontend.uri())).await.unwrap();

        assert!(report.is_healthy());
        assert_eq!(report.backend.data, Some(json!({"status": "ok", "db": "connected"})));
        assert_eq!(report.frontend.data, None);

        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["backend"]["status"], "healthy");
        assert_eq!(out["backend"]["data"]["db"], "connected");
        assert!(out["backend"].get("error").is_none());
        assert!(out["frontend"].get("data").is_none());
        assert!(out["backend"]["responseTime"].is_u64());
        assert!(out["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_backend_down_frontend_up() {
        let frontend = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&frontend)
            .await;

        let report = check_health(&config("http://127.0.0.1:1".to_string(), frontend.uri()))
            .await
            .unwrap();

        assert!(!report.is_healthy());

        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["backend"]["status"], "unhealthy");
        assert!(out["backend"]["error"].is_string());
        assert!(out["backend"].get("data").is_none());
        assert_eq!(out["frontend"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_non_200_is_unhealthy() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&backend)
            .await;

        let frontend = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&frontend)
            .await;

        let report = check_health(&config(backend.uri(), frontend.uri())).await.unwrap();

        assert_eq!(report.backend.status, HealthStatus::Unhealthy);
        assert_eq!(report.backend.error, None);
        assert_eq!(report.backend.data, Some(Value::String(String::new())));
        assert_eq!(report.frontend.status, HealthStatus::Unhealthy);
        assert_eq!(report.frontend.data, None);
        assert_eq!(report.frontend.error.as_deref(), Some("unexpected status code 503"));
    }

    #[tokio::test]
    async fn test_plain_text_backend_body() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&backend)
            .await;

        let report = check_health(&config(format!("{}/", backend.uri()), "http://127.0.0.1:1".to_string()))
            .await
            .unwrap();

        assert!(report.backend.is_healthy());
        assert_eq!(report.backend.data, Some(Value::String("OK".to_string())));
        assert!(!report.frontend.is_healthy());
    }

    #[test]
    fn test_body_value() {
        assert_eq!(body_value("{\"a\":1}".to_string()), json!({"a": 1}));
        assert_eq!(body_value("up".to_string()), json!("up"));
    }
}
