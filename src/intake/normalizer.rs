//! Message normalizer — converts raw inbound shapes into canonical
//! `IntakeRecord`s.

use chrono::Utc;
use uuid::Uuid;

use crate::intake::{RawAttachment, RawMessage, WebFormSubmission};
use crate::pipeline::types::IntakeRecord;

/// Fallback requester name when the sender gave none.
const UNKNOWN_REQUESTER: &str = "Unknown";

/// Normalize a raw mail message into an `IntakeRecord`.
///
/// The subject is folded into `free_text` as a `Subject:` first line so
/// downstream consumers see one content field. A missing receive date
/// falls back to now — ordering still holds because enqueue sorts.
pub fn normalize_mail(message: RawMessage) -> IntakeRecord {
    let free_text = match message.subject.as_deref().map(str::trim) {
        Some(subject) if !subject.is_empty() => {
            format!("Subject: {subject}\n\n{}", message.body.trim())
        }
        _ => message.body.trim().to_string(),
    };

    IntakeRecord {
        id: Uuid::new_v4(),
        received_at: message.received_at.unwrap_or_else(Utc::now),
        requester_name: message
            .sender_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_REQUESTER.to_string()),
        requester_email: message.sender_address.trim().to_string(),
        free_text,
        attachment_text: join_attachment_text(&message.attachments),
        consumed: false,
    }
}

/// Normalize a web-form submission into an `IntakeRecord`.
///
/// Forms have no transport timestamp, so receipt time is now.
pub fn normalize_form(submission: WebFormSubmission) -> IntakeRecord {
    IntakeRecord {
        id: Uuid::new_v4(),
        received_at: Utc::now(),
        requester_name: submission.requester.trim().to_string(),
        requester_email: submission.email.trim().to_string(),
        free_text: submission.description.trim().to_string(),
        attachment_text: join_attachment_text(&submission.attachments),
        consumed: false,
    }
}

/// Concatenate extracted attachment text, blank-line separated, skipping
/// attachments that produced nothing.
fn join_attachment_text(attachments: &[RawAttachment]) -> String {
    attachments
        .iter()
        .map(|a| a.extracted_text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(subject: Option<&str>, body: &str) -> RawMessage {
        RawMessage {
            sender_name: Some("Alice".into()),
            sender_address: "alice@example.com".into(),
            subject: subject.map(String::from),
            body: body.into(),
            attachments: vec![],
            received_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn subject_is_folded_into_free_text() {
        let record = normalize_mail(raw(Some("Quote for 2 laptops"), "Please price these."));
        assert_eq!(
            record.free_text,
            "Subject: Quote for 2 laptops\n\nPlease price these."
        );
    }

    #[test]
    fn empty_subject_is_dropped() {
        let record = normalize_mail(raw(Some("   "), "Body only."));
        assert_eq!(record.free_text, "Body only.");
    }

    #[test]
    fn missing_sender_name_defaults_to_unknown() {
        let mut message = raw(None, "hi");
        message.sender_name = None;
        let record = normalize_mail(message);
        assert_eq!(record.requester_name, "Unknown");
    }

    #[test]
    fn receive_date_is_preserved() {
        let record = normalize_mail(raw(None, "hi"));
        assert_eq!(
            record.received_at,
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn attachment_text_is_joined_with_blank_lines() {
        let mut message = raw(None, "see attached");
        message.attachments = vec![
            RawAttachment {
                name: "list.pdf".into(),
                mime_type: "application/pdf".into(),
                extracted_text: "2x laptop".into(),
            },
            RawAttachment {
                name: "photo.png".into(),
                mime_type: "image/png".into(),
                extracted_text: "".into(),
            },
            RawAttachment {
                name: "notes.txt".into(),
                mime_type: "text/plain".into(),
                extracted_text: "deliver by friday".into(),
            },
        ];
        let record = normalize_mail(message);
        assert_eq!(record.attachment_text, "2x laptop\n\ndeliver by friday");
    }

    #[test]
    fn form_submission_normalizes() {
        let record = normalize_form(WebFormSubmission {
            requester: " Bob ".into(),
            email: "bob@example.com".into(),
            description: "Need a price for 10 monitors".into(),
            attachments: vec![],
        });
        assert_eq!(record.requester_name, "Bob");
        assert_eq!(record.requester_email, "bob@example.com");
        assert!(!record.consumed);
        assert!(record.attachment_text.is_empty());
    }
}
