//! Best-effort evaluator notification with bounded retry.
//!
//! Up to five attempts with exponential backoff (1, 2, 4, 8 seconds waited
//! before each retry, never before the first attempt). Never returns an
//! error: the deployment already succeeded by the time this runs, and
//! delivery is best-effort by contract.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::NotificationPayload;

/// Retry policy for evaluator delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait before the first retry; doubles after every attempt.
    pub initial_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Transport-level delivery failure (connection error or timeout).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// One-shot delivery of the payload to the callback URL.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// Deliver the payload; returns the HTTP status code on any response.
    async fn post(
        &self,
        url: &str,
        payload: &NotificationPayload,
        timeout: Duration,
    ) -> Result<u16, TransportError>;
}

/// Informational outcome of a notification. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub delivered: bool,
    pub attempts: u32,
}

/// Deliver `payload` to `url` under the retry policy.
pub async fn notify(
    transport: &dyn CallbackTransport,
    policy: &RetryPolicy,
    url: &str,
    payload: &NotificationPayload,
) -> NotificationOutcome {
    let mut delay = policy.initial_delay;
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
        match transport.post(url, payload, policy.attempt_timeout).await {
            Ok(status) if (200..300).contains(&status) => {
                info!(attempt, "evaluator notified");
                return NotificationOutcome {
                    delivered: true,
                    attempts: attempt,
                };
            }
            Ok(status) => {
                warn!(attempt, status, "evaluator returned non-success status");
            }
            Err(err) => {
                warn!(attempt, error = %err, "evaluator delivery failed");
            }
        }
    }
    warn!(
        attempts = policy.max_attempts,
        "evaluator notification exhausted retries"
    );
    NotificationOutcome {
        delivered: false,
        attempts: policy.max_attempts,
    }
}

/// Production transport over reqwest.
pub struct HttpCallback {
    http: reqwest::Client,
}

impl HttpCallback {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpCallback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallbackTransport for HttpCallback {
    async fn post(
        &self,
        url: &str,
        payload: &NotificationPayload,
        timeout: Duration,
    ) -> Result<u16, TransportError> {
        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}
