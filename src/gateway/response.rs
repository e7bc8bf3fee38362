//! Normalization of heterogeneous gateway responses.
//!
//! The classifier is a third party and its response shape drifts: flags
//! under different names, an item list or a single item or nothing,
//! totals as numbers or strings. Everything here is typed union parsing
//! with explicit fallback branches — no dynamic probing.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::pipeline::types::{IntakeRecord, LineItem, QuotationDraft};

/// Guidance text for invalid requests when the classifier supplied none.
const DEFAULT_INVALID_NOTES: &str =
    "The request could not be interpreted as a quotation. Ask the sender \
     for item descriptions, quantities, and any reference documents.";

/// Wire-level gateway reply. Field names tolerate the shapes the gateway
/// has been observed to produce.
#[derive(Debug, Deserialize)]
pub struct WireReply {
    #[serde(alias = "isValid", alias = "is_valid", default)]
    pub valid: Option<bool>,
    #[serde(alias = "needsReview", alias = "review", default)]
    pub needs_review: Option<bool>,
    /// Explicit list, or a single item object — both land here.
    #[serde(alias = "item", alias = "lineItems", alias = "line_items", default)]
    pub items: Option<WireItems>,
    /// Authoritative total, when the gateway supplies one.
    #[serde(default)]
    pub total: Option<WireNumber>,
    #[serde(alias = "explanationText", alias = "explanation", default)]
    pub notes: Option<String>,
}

/// Item field: a list or a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireItems {
    Many(Vec<WireItem>),
    One(WireItem),
}

#[derive(Debug, Deserialize)]
pub struct WireItem {
    #[serde(alias = "desc", alias = "name", default)]
    pub description: Option<String>,
    #[serde(alias = "qty", default)]
    pub quantity: Option<WireNumber>,
    #[serde(alias = "unitPrice", alias = "price", default)]
    pub unit_price: Option<WireNumber>,
}

/// A number that may arrive as an integer, a float, or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl WireNumber {
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Int(i) => Some(Decimal::from(*i)),
            Self::Float(f) => Decimal::from_f64_retain(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn to_quantity(&self) -> Option<u32> {
        match self {
            Self::Int(i) if *i >= 0 => u32::try_from(*i).ok(),
            Self::Float(f) if *f >= 0.0 => Some(f.round() as u32),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Normalize a wire reply into the canonical draft.
///
/// A missing validity flag is read as valid — the gateway answered, and
/// an over-cautious rejection would bounce a priceable request back to
/// the sender.
pub fn normalize(reply: WireReply, intake: &IntakeRecord, revision_threshold: Decimal) -> QuotationDraft {
    if !reply.valid.unwrap_or(true) {
        return QuotationDraft {
            valid: false,
            client_name: intake.requester_name.clone(),
            client_email: intake.requester_email.clone(),
            line_items: vec![LineItem::unspecified()],
            total: Decimal::ZERO,
            needs_review: false,
            notes: reply
                .notes
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INVALID_NOTES.to_string()),
        };
    }

    let line_items = match reply.items {
        Some(WireItems::Many(items)) if !items.is_empty() => {
            items.into_iter().map(into_line_item).collect()
        }
        Some(WireItems::One(item)) => vec![into_line_item(item)],
        // Nothing extractable — keep the draft priceable at zero.
        Some(WireItems::Many(_)) | None => vec![LineItem::unspecified()],
    };

    // Gateway total wins over the computed sum when present. Negative
    // amounts are treated as absent — line items never carry negative
    // prices, so the fallback sum is always non-negative.
    let total = reply
        .total
        .as_ref()
        .and_then(WireNumber::to_decimal)
        .filter(|t| !t.is_sign_negative())
        .unwrap_or_else(|| line_items.iter().map(LineItem::subtotal).sum());

    let needs_review = reply.needs_review.unwrap_or(false) || total > revision_threshold;

    QuotationDraft {
        valid: true,
        client_name: intake.requester_name.clone(),
        client_email: intake.requester_email.clone(),
        line_items,
        total,
        needs_review,
        notes: reply.notes.unwrap_or_default(),
    }
}

fn into_line_item(item: WireItem) -> LineItem {
    LineItem {
        description: item
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "Unspecified item".to_string()),
        quantity: item.quantity.as_ref().and_then(WireNumber::to_quantity).unwrap_or(1),
        unit_price: item
            .unit_price
            .as_ref()
            .and_then(WireNumber::to_decimal)
            .filter(|p| !p.is_sign_negative())
            .unwrap_or(Decimal::ZERO),
    }
}
