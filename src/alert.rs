//! Webhook alerting for down services.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::store::CheckResult;

const ALERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Alert delivery error types.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("failed to deliver alert: {0}")]
    Network(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Status(u16),
}

/// Slack-compatible alert body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertMessage {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub color: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl Field {
    fn new(title: &str, value: &str, short: bool) -> Self {
        Self {
            title: title.to_string(),
            value: value.to_string(),
            short,
        }
    }
}

impl AlertMessage {
    /// Summarize the down services of one cycle, one attachment each.
    ///
    /// Returns `None` when nothing is down.
    pub fn for_down<'a, I>(down: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a CheckResult>,
    {
        let attachments: Vec<Attachment> = down
            .into_iter()
            .map(|result| Attachment {
                color: "danger".to_string(),
                fields: vec![
                    Field::new("Service", &result.name, true),
                    Field::new("URL", &result.url, true),
                    Field::new("Error", &result.failure_detail(), false),
                ],
            })
            .collect();

        if attachments.is_empty() {
            return None;
        }

        Some(Self {
            text: format!("🚨 Service Alert: {} service(s) are down", attachments.len()),
            attachments,
        })
    }
}

/// Posts alerts to a single webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    /// Deliver one alert. Any non-2xx answer is an error.
    pub async fn send(&self, message: &AlertMessage) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(ALERT_TIMEOUT)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::Status(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn down_results() -> Vec<CheckResult> {
        vec![
            CheckResult::failed(
                &ServiceConfig::new("Backend API", "http://api.local/health"),
                "connection refused",
                Duration::from_millis(2),
            ),
            CheckResult::answered(
                &ServiceConfig::new("Frontend", "http://web.local"),
                502,
                Duration::from_millis(30),
            ),
        ]
    }

    #[test]
    fn test_no_message_when_nothing_down() {
        assert!(AlertMessage::for_down(Vec::<&CheckResult>::new()).is_none());
    }

    #[test]
    fn test_message_shape() {
        let results = down_results();
        let message = AlertMessage::for_down(&results).unwrap();

        assert_eq!(message.text, "🚨 Service Alert: 2 service(s) are down");
        assert_eq!(
            serde_json::to_value(&message).unwrap()["attachments"][0],
            json!({
                "color": "danger",
                "fields": [
                    {"title": "Service", "value": "Backend API", "short": true},
                    {"title": "URL", "value": "http://api.local/health", "short": true},
                    {"title": "Error", "value": "connection refused", "short": false}
                ]
            })
        );
        assert_eq!(message.attachments[1].fields[2].value, "HTTP 502");
    }

    #[tokio::test]
    async fn test_send_posts_json() {
        let results = down_results();
        let message = AlertMessage::for_down(&results).unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(&message))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(Client::new(), &format!("{}/hook", server.uri()));
        assert_ok!(notifier.send(&message).await);
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let results = down_results();
        let message = AlertMessage::for_down(&results).unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(Client::new(), &server.uri());
        let err = assert_err!(notifier.send(&message).await);
        assert!(matches!(err, AlertError::Status(403)));
    }

    #[tokio::test]
    async fn test_send_unreachable() {
        let results = down_results();
        let message = AlertMessage::for_down(&results).unwrap();

        let notifier = WebhookNotifier::new(Client::new(), "http://127.0.0.1:1/hook");
        let err = assert_err!(notifier.send(&message).await);
        assert!(matches!(err, AlertError::Network(_)));
    }
}
