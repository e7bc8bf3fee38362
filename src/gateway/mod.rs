//! Classification gateway client.
//!
//! Calls the external pricing/classification service with a bounded retry
//! loop and per-attempt timeout, and normalizes whatever comes back into
//! a canonical `QuotationDraft`. The classifier is an untrusted, possibly
//! slow third party: this client never lets its failure escape — after
//! the retry budget is spent it resolves to a degraded draft so the
//! emitter always has a uniform input.

pub mod response;

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::pipeline::types::{Classifier, IntakeRecord, LineItem, QuotationDraft};
use rust_decimal::Decimal;

/// Upper bound on the random jitter added to the fixed retry delay.
const JITTER_MAX_MS: u64 = 250;

/// Request payload sent to the gateway.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPayload<'a> {
    message: &'a str,
    sender_name: &'a str,
    sender_email: &'a str,
    attachment_text: &'a str,
}

/// HTTP client for the classification gateway.
pub struct GatewayClient {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.attempt_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// One POST to the gateway, bounded by the per-attempt timeout.
    async fn attempt(&self, payload: &RequestPayload<'_>) -> Result<response::WireReply, GatewayError> {
        let reply = self
            .http
            .post(&self.config.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout {
                        timeout: self.config.attempt_timeout,
                    }
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = reply.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
            });
        }

        reply.json().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    timeout: self.config.attempt_timeout,
                }
            } else {
                GatewayError::Decode(e.to_string())
            }
        })
    }

    /// Degraded draft after the retry budget is spent.
    ///
    /// The notes distinguish a timeout from a hard error so the reviewer
    /// knows whether a delayed answer may still arrive.
    fn degraded(&self, intake: &IntakeRecord, error: &GatewayError) -> QuotationDraft {
        let notes = if error.is_timeout() {
            format!(
                "Classification timed out after {} attempts; processing is delayed and an \
                 answer may still arrive. Manual review required. ({error})",
                self.config.max_attempts
            )
        } else {
            format!(
                "Classification failed after {} attempts; no automatic answer is coming. \
                 Manual review required. ({error})",
                self.config.max_attempts
            )
        };

        QuotationDraft {
            valid: false,
            client_name: intake.requester_name.clone(),
            client_email: intake.requester_email.clone(),
            line_items: vec![LineItem::unspecified()],
            total: Decimal::ZERO,
            needs_review: true,
            notes,
        }
    }
}

#[async_trait]
impl Classifier for GatewayClient {
    /// Classify an intake record. Never errors: terminal failures resolve
    /// to a degraded draft.
    ///
    /// Explicit retry loop — fixed inter-attempt delay plus a little
    /// jitter, no exponential growth.
    async fn classify(&self, intake: &IntakeRecord) -> QuotationDraft {
        let payload = RequestPayload {
            message: &intake.free_text,
            sender_name: &intake.requester_name,
            sender_email: &intake.requester_email,
            attachment_text: &intake.attachment_text,
        };

        let mut last_error = None;
        for attempt in 1..=self.config.max_attempts.max(1) {
            match self.attempt(&payload).await {
                Ok(reply) => {
                    debug!(id = %intake.id, attempt, "Gateway replied");
                    return response::normalize(reply, intake, self.config.revision_threshold);
                }
                Err(e) => {
                    warn!(
                        id = %intake.id,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Gateway attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt < self.config.max_attempts {
                let jitter = rand::thread_rng().gen_range(0..JITTER_MAX_MS);
                tokio::time::sleep(
                    self.config.retry_delay + std::time::Duration::from_millis(jitter),
                )
                .await;
            }
        }

        // Retries exhausted; last_error is always set here.
        let error = last_error.unwrap_or(GatewayError::Transport("no attempt made".into()));
        warn!(id = %intake.id, error = %error, "Gateway retries exhausted, degrading");
        self.degraded(intake, &error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;

    fn client() -> GatewayClient {
        GatewayClient::new(GatewayConfig {
            endpoint: "http://127.0.0.1:9/classify".into(),
            revision_threshold: Decimal::from(2_000_000u64),
            attempt_timeout: Duration::from_millis(200),
            max_attempts: 3,
            retry_delay: Duration::from_millis(10),
        })
        .unwrap()
    }

    fn intake() -> IntakeRecord {
        IntakeRecord {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            requester_name: "Alice".into(),
            requester_email: "alice@example.com".into(),
            free_text: "price 2 laptops".into(),
            attachment_text: String::new(),
            consumed: false,
        }
    }

    #[test]
    fn degraded_timeout_draft_mentions_delay() {
        let client = client();
        let draft = client.degraded(
            &intake(),
            &GatewayError::Timeout {
                timeout: Duration::from_secs(30),
            },
        );
        assert!(!draft.valid);
        assert!(draft.needs_review);
        assert!(draft.notes.contains("delayed"));
    }

    #[test]
    fn degraded_hard_error_draft_does_not_promise_an_answer() {
        let client = client();
        let draft = client.degraded(&intake(), &GatewayError::Status { status: 502 });
        assert!(!draft.valid);
        assert!(draft.needs_review);
        assert!(draft.notes.contains("no automatic answer"));
        assert!(!draft.notes.contains("delayed"));
    }
}
