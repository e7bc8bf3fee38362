//! Revision router — pure decision mapping a draft to its destination.

use crate::pipeline::types::QuotationDraft;

/// Where a draft goes and whether it is an escalation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub destination: String,
    pub is_escalation: bool,
}

/// Route a draft: needs-review drafts escalate to the supervisor,
/// everything else goes back to the client. No I/O, no side effects.
pub fn route(draft: &QuotationDraft, supervisor_address: &str) -> Route {
    let is_escalation = draft.needs_review;
    Route {
        destination: if is_escalation {
            supervisor_address.to_string()
        } else {
            draft.client_email.clone()
        },
        is_escalation,
    }
}
