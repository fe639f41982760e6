//! Outbound webhook delivery
//!
//! Every delivery is a JSON `POST` carrying:
//!
//! - `Content-Type: application/json`
//! - `X-Dash-Event: true` marking the request as platform-originated
//! - `Authorization: Bearer <token>` when a token is configured
//! - `X-OpenClaw-Session: <key>` on single events forwarded for a session
//!
//! Failures are retried per [`RetryPolicy`] when they look transient
//! (connection errors, timeouts, 429, 5xx). Other 4xx answers fail at once.

use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use crate::events::{BridgedEvent, EventBatch};
use async_trait::async_trait;
use serde::Serialize;

/// Header marking requests as originating from the platform
pub const PLATFORM_HEADER: &str = "X-Dash-Event";

/// Header carrying the external session key
pub const SESSION_HEADER: &str = "X-OpenClaw-Session";

/// Destination for bridged events
#[async_trait]
pub trait WebhookDelivery: Send + Sync {
    /// Deliver one event, optionally tagged with the session it belongs to
    async fn send_event(&self, event: &BridgedEvent, session_key: Option<&str>) -> Result<()>;

    /// Deliver a batch as an [`EventBatch`] body
    async fn send_batch(&self, events: &[BridgedEvent]) -> Result<()>;
}

/// HTTP webhook client
pub struct HttpWebhook {
    client: reqwest::Client,
    url: String,
    auth_token: Option<String>,
    retry: RetryPolicy,
}

impl HttpWebhook {
    pub fn new(url: impl Into<String>, auth_token: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            auth_token,
            retry,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post<B: Serialize + ?Sized + Sync>(
        &self,
        body: &B,
        session_key: Option<&str>,
    ) -> Result<()> {
        let mut retry = 0;
        loop {
            match self.attempt(body, session_key).await {
                Ok(()) => return Ok(()),
                Err(Attempt::Permanent(err)) => return Err(err),
                Err(Attempt::Transient(err)) if retry >= self.retry.max_retries => return Err(err),
                Err(Attempt::Transient(err)) => {
                    let delay = self.retry.delay_for(retry);
                    tracing::warn!(
                        url = %self.url,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Webhook delivery failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }

    async fn attempt<B: Serialize + ?Sized + Sync>(
        &self,
        body: &B,
        session_key: Option<&str>,
    ) -> std::result::Result<(), Attempt> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header(PLATFORM_HEADER, "true")
            .json(body);
        if let Some(token) = &self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(key) = session_key {
            request = request.header(SESSION_HEADER, key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = Error::Webhook {
                    status: None,
                    message: e.to_string(),
                };
                return Err(if e.is_connect() || e.is_timeout() || e.is_request() {
                    Attempt::Transient(err)
                } else {
                    Attempt::Permanent(err)
                });
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let err = Error::Webhook {
            status: Some(status.as_u16()),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        };
        if status.is_server_error() || status.as_u16() == 429 {
            Err(Attempt::Transient(err))
        } else {
            Err(Attempt::Permanent(err))
        }
    }
}

enum Attempt {
    Transient(Error),
    Permanent(Error),
}

#[async_trait]
impl WebhookDelivery for HttpWebhook {
    async fn send_event(&self, event: &BridgedEvent, session_key: Option<&str>) -> Result<()> {
        self.post(event, session_key).await
    }

    async fn send_batch(&self, events: &[BridgedEvent]) -> Result<()> {
        let batch = EventBatch::new(events.to_vec());
        self.post(&batch, None).await
    }
}
