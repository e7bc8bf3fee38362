//! Inbound intake: raw message shapes, normalization, and the ingestion
//! queue.

pub mod normalizer;
pub mod queue;

pub use normalizer::{normalize_form, normalize_mail};
pub use queue::IntakeQueue;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw parsed message as delivered by the mailbox connector.
///
/// MIME parsing, attachment text extraction (PDF text / OCR), and
/// mark-as-read semantics all happen upstream — this is the plain record
/// the core receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub sender_name: Option<String>,
    pub sender_address: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
    pub received_at: Option<DateTime<Utc>>,
}

/// One attachment, already reduced to plain text upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAttachment {
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub extracted_text: String,
}

/// A validated web-form submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebFormSubmission {
    pub requester: String,
    pub email: String,
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
}
