//! Outcome emitter — document generation, notification dispatch, and
//! draft persistence for one processed record.
//!
//! Delivering *some* communication outranks delivering a perfect one:
//! a failed document render degrades to a notification-only message,
//! while notify/persist failures surface to the dispatcher so the tick
//! is retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EmitError;
use crate::pipeline::types::{ProcessingOutcome, QuotationDraft, QuoteStatus};

// ── Collaborator traits ─────────────────────────────────────────────

/// Renders a pre-invoice document for a valid draft.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, reference: &str, draft: &QuotationDraft)
        -> Result<PathBuf, EmitError>;
}

/// Delivers a notification, optionally with an attached document.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> Result<(), EmitError>;
}

/// Durably records a draft and its terminal status.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save(
        &self,
        source_record_id: Uuid,
        draft: &QuotationDraft,
        status: QuoteStatus,
    ) -> Result<Uuid, EmitError>;
}

// ── Emitter ─────────────────────────────────────────────────────────

/// Orchestrates the terminal side of a dispatch attempt.
pub struct OutcomeEmitter {
    renderer: Arc<dyn DocumentRenderer>,
    transport: Arc<dyn NotificationTransport>,
    sink: Arc<dyn PersistenceSink>,
}

impl OutcomeEmitter {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        transport: Arc<dyn NotificationTransport>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        Self {
            renderer,
            transport,
            sink,
        }
    }

    /// Emit the outcome for one draft: render (best effort), notify,
    /// persist.
    ///
    /// Render failures are recovered here; notify and persist failures
    /// propagate to the caller, which must not mark the record consumed.
    pub async fn emit(
        &self,
        record_id: Uuid,
        draft: &QuotationDraft,
        destination: &str,
        is_escalation: bool,
        reference: &str,
    ) -> Result<ProcessingOutcome, EmitError> {
        let document_path = if draft.valid {
            match self.renderer.render(reference, draft).await {
                Ok(path) => {
                    info!(reference, path = %path.display(), "Pre-invoice rendered");
                    Some(path)
                }
                Err(e) => {
                    warn!(reference, error = %e, "Document render failed, sending without attachment");
                    None
                }
            }
        } else {
            None
        };

        let (subject, body) = compose_message(draft, is_escalation, reference);

        self.transport
            .send(destination, &subject, &body, document_path.as_deref())
            .await?;

        let status = draft.status();
        self.sink.save(record_id, draft, status).await?;

        info!(
            record_id = %record_id,
            reference,
            destination,
            escalation = is_escalation,
            status = ?status,
            "Outcome emitted"
        );

        Ok(ProcessingOutcome {
            record_id,
            draft: draft.clone(),
            destination: destination.to_string(),
            document_path,
            dispatched_at: Utc::now(),
        })
    }
}

// ── Message templates ───────────────────────────────────────────────

/// Pick the message body: {escalation, normal} × {valid, invalid}.
fn compose_message(draft: &QuotationDraft, is_escalation: bool, reference: &str) -> (String, String) {
    match (is_escalation, draft.valid) {
        (true, true) => (
            format!("Quotation {reference} requires review"),
            format!(
                "A quotation exceeds the automatic approval limits and requires review.\n\n\
                 Reference: {reference}\n\
                 Client: {} <{}>\n\
                 {}\
                 Total: {} Kz\n\n\
                 {}",
                draft.client_name,
                draft.client_email,
                format_items(draft),
                draft.total,
                if draft.notes.is_empty() {
                    String::new()
                } else {
                    format!("Classifier notes: {}\n", draft.notes)
                }
            ),
        ),
        (true, false) => (
            format!("Quotation request {reference} needs manual handling"),
            format!(
                "An inbound request could not be classified automatically and needs \
                 manual handling.\n\n\
                 Reference: {reference}\n\
                 Sender: {} <{}>\n\n\
                 {}",
                draft.client_name, draft.client_email, draft.notes
            ),
        ),
        (false, true) => (
            format!("Your quotation {reference}"),
            format!(
                "Hello {},\n\n\
                 Thank you for your request. Please find your quotation below.\n\n\
                 Reference: {reference}\n\
                 {}\
                 Total: {} Kz\n\n\
                 The pre-invoice is attached when available. Reply to this message \
                 with any questions.",
                draft.client_name,
                format_items(draft),
                draft.total,
            ),
        ),
        (false, false) => (
            "We need more information about your request".to_string(),
            format!(
                "Hello {},\n\n\
                 We received your request but could not identify the items you need \
                 priced.\n\n{}\n\n\
                 Please reply with the item descriptions and quantities and we will \
                 send a quotation right away.",
                draft.client_name, draft.notes
            ),
        ),
    }
}

fn format_items(draft: &QuotationDraft) -> String {
    let mut out = String::new();
    for item in &draft.line_items {
        out.push_str(&format!(
            "  - {} × {} @ {} Kz\n",
            item.quantity, item.description, item.unit_price
        ));
    }
    out
}
