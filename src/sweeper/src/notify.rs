//! Failure notifications.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const FAILURE_SUBJECT: &str = "Daily Cleanup Job Failed";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to send notification: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification endpoint {destination} answered {status}")]
    Rejected {
        destination: String,
        status: reqwest::StatusCode,
    },
}

/// Delivers a message to an alerting destination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notification(
        &self,
        destination: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
}

/// Posts `{"subject": ..., "body": ...}` as JSON to the destination URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_notification(
        &self,
        destination: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(destination)
            .json(&WebhookPayload { subject, body })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                destination: destination.to_string(),
                status,
            });
        }

        tracing::info!(destination = %destination, subject = %subject, "Sent notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = WebhookPayload {
            subject: FAILURE_SUBJECT,
            body: "Error during cleanup process: boom",
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["subject"], "Daily Cleanup Job Failed");
        assert_eq!(json["body"], "Error during cleanup process: boom");
    }

    #[tokio::test]
    async fn test_unreachable_destination_is_an_error() {
        let notifier = WebhookNotifier::new(Duration::from_secs(2)).unwrap();

        // Port 9 (discard) on localhost is not expected to run an HTTP server
        let result = notifier
            .send_notification("http://127.0.0.1:9/alerts", FAILURE_SUBJECT, "body")
            .await;
        assert!(matches!(result, Err(NotifyError::Http(_))));
    }

    #[tokio::test]
    async fn test_invalid_destination_is_an_error() {
        let notifier = WebhookNotifier::new(Duration::from_secs(2)).unwrap();

        let result = notifier
            .send_notification("not a url", FAILURE_SUBJECT, "body")
            .await;
        assert!(result.is_err());
    }
}
