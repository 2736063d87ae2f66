//! HTTP probe implementation.

use reqwest::Client;
use std::collections::BTreeMap;
use std::error::Error as _;
use std::time::{Duration, Instant};

use super::ProbeError;
use crate::config::ServiceConfig;
use crate::store::CheckResult;

/// A fully received HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Build the HTTP client shared by all probes of one component.
///
/// Timeouts are set per request, not on the client.
pub fn build_client() -> Result<Client, ProbeError> {
    Client::builder()
        .build()
        .map_err(|e| ProbeError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Issue a GET against `url` and read the full body.
///
/// Any response, whatever its status code, is `Ok`; only transport
/// failures and timeouts are errors.
pub async fn fetch(
    client: &Client,
    url: &str,
    timeout: Duration,
    headers: &BTreeMap<String, String>,
) -> Result<HttpResponse, ProbeError> {
    let mut request = client.get(url).timeout(timeout);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request.send().await.map_err(|e| map_error(e, timeout))?;
    let status = response.status().as_u16();

    // Read the full body to measure complete transfer time
    let body = response.text().await.map_err(|e| map_error(e, timeout))?;

    Ok(HttpResponse { status, body })
}

/// Check one service and classify the outcome.
///
/// Never fails: transport errors become a `down` result carrying the error.
pub async fn check_service(client: &Client, service: &ServiceConfig) -> CheckResult {
    let start = Instant::now();

    match fetch(client, &service.url, service.timeout_duration(), &service.headers).await {
        Ok(response) => CheckResult::answered(service, response.status, start.elapsed()),
        Err(e) => {
            tracing::debug!("Check failed for {}: {}", service.name, e);
            CheckResult::failed(service, e.to_string(), start.elapsed())
        }
    }
}

fn map_error(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else if e.is_builder() {
        ProbeError::Config(error_chain(&e))
    } else {
        ProbeError::Network(error_chain(&e))
    }
}

/// Join an error with its sources, so the root cause (e.g. "Connection
/// refused") is not lost behind reqwest's generic message.
fn error_chain(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
