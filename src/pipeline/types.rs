//! Shared types for the quotation processing pipeline.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Intake record ───────────────────────────────────────────────────

/// One unit of inbound demand, normalized from email or a web form.
///
/// Created by the normalizer, owned by the ingestion queue until claimed
/// by the dispatcher for one processing attempt. Never mutated except for
/// `consumed`, which the dispatcher sets exactly once after a terminal
/// outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeRecord {
    /// Unique ID, assigned at enqueue time.
    pub id: Uuid,
    /// Queue ordering key.
    pub received_at: DateTime<Utc>,
    /// Who is asking.
    pub requester_name: String,
    pub requester_email: String,
    /// The request content (subject folded in as a first line, if any).
    pub free_text: String,
    /// Concatenated plain text extracted from attachments. Opaque to the
    /// rest of the pipeline.
    pub attachment_text: String,
    /// Set once, by the dispatcher, after a terminal outcome.
    pub consumed: bool,
}

// ── Quotation draft ─────────────────────────────────────────────────

/// One priced line of a quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    /// Placeholder line used when nothing priceable could be extracted.
    pub fn unspecified() -> Self {
        Self {
            description: "Unspecified item".into(),
            quantity: 1,
            unit_price: Decimal::ZERO,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Canonical, pipeline-internal shape produced by classification.
///
/// Created once per processed intake record, immutable after creation,
/// persisted verbatim, never re-enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationDraft {
    /// Whether the classifier could extract an actionable request.
    pub valid: bool,
    pub client_name: String,
    pub client_email: String,
    pub line_items: Vec<LineItem>,
    /// Gateway-supplied total when present, else the sum of line items.
    pub total: Decimal,
    /// Classifier flag OR total above the revision threshold.
    pub needs_review: bool,
    /// Human-readable explanation. Non-empty whenever `valid` is false.
    pub notes: String,
}

impl QuotationDraft {
    /// Final persisted status for this draft.
    ///
    /// Review takes precedence: a degraded draft is both invalid and
    /// flagged, and a flagged draft always lands with the supervisor.
    pub fn status(&self) -> QuoteStatus {
        if self.needs_review {
            QuoteStatus::PendingReview
        } else if !self.valid {
            QuoteStatus::Rejected
        } else {
            QuoteStatus::Completed
        }
    }
}

/// Terminal status recorded by the persistence sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    /// Priced automatically, under the review threshold.
    Completed,
    /// Awaiting supervisor review.
    PendingReview,
    /// Could not be interpreted as an actionable request.
    Rejected,
}

// ── Processing outcome ──────────────────────────────────────────────

/// Record of one dispatch attempt. Logging and tests only — not persisted
/// as its own entity.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub record_id: Uuid,
    pub draft: QuotationDraft,
    pub destination: String,
    pub document_path: Option<PathBuf>,
    pub dispatched_at: DateTime<Utc>,
}

// ── Classifier trait ────────────────────────────────────────────────

/// Seam between the dispatcher and the classification gateway.
///
/// Infallible by contract: terminal gateway failures must resolve to a
/// degraded draft, never an error — the emitter needs a uniform input.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, intake: &IntakeRecord) -> QuotationDraft;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft(valid: bool, needs_review: bool) -> QuotationDraft {
        QuotationDraft {
            valid,
            client_name: "Alice".into(),
            client_email: "alice@example.com".into(),
            line_items: vec![],
            total: Decimal::ZERO,
            needs_review,
            notes: String::new(),
        }
    }

    #[test]
    fn subtotal_multiplies_quantity_by_unit_price() {
        let item = LineItem {
            description: "Laptop".into(),
            quantity: 2,
            unit_price: dec!(350000),
        };
        assert_eq!(item.subtotal(), dec!(700000));
    }

    #[test]
    fn unspecified_item_is_free() {
        let item = LineItem::unspecified();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(draft(true, false).status(), QuoteStatus::Completed);
        assert_eq!(draft(true, true).status(), QuoteStatus::PendingReview);
        assert_eq!(draft(false, false).status(), QuoteStatus::Rejected);
        // Degraded gateway drafts are invalid *and* flagged; review wins.
        assert_eq!(draft(false, true).status(), QuoteStatus::PendingReview);
    }

    #[test]
    fn quote_status_serializes_screaming_snake() {
        let json = serde_json::to_value(QuoteStatus::PendingReview).unwrap();
        assert_eq!(json, "PENDING_REVIEW");
    }
}
