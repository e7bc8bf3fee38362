//! Ingestion queue — ordered, in-memory holding area for intake records.
//!
//! Ordering is strictly ascending `received_at`, ties broken by insertion
//! order (stable sort on every enqueue). `peek_next` never removes; only
//! `mark_consumed` does. That split lets the dispatcher abandon an attempt
//! without losing the record's place: it simply stays head-of-queue for
//! the next tick.

use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use crate::pipeline::types::IntakeRecord;

/// Ordered in-memory queue of records awaiting processing.
///
/// Single-writer/single-reader per tick; a plain mutex around a vec is
/// all the locking this needs.
#[derive(Default)]
pub struct IntakeQueue {
    inner: Mutex<Vec<IntakeRecord>>,
}

impl IntakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and re-sort by receipt time.
    ///
    /// Never fails: the queue is in-memory and unbounded. A duplicate id
    /// is a programmer error, not a runtime path.
    pub fn enqueue(&self, record: IntakeRecord) {
        let mut queue = self.inner.lock().expect("intake queue poisoned");
        assert!(
            queue.iter().all(|r| r.id != record.id),
            "duplicate intake record id {}",
            record.id
        );
        debug!(id = %record.id, received_at = %record.received_at, "Enqueued intake record");
        queue.push(record);
        // Stable sort: equal timestamps keep insertion order.
        queue.sort_by_key(|r| r.received_at);
    }

    /// Return a copy of the head record without removing it.
    ///
    /// Consumed records are skipped defensively; they should already be
    /// gone.
    pub fn peek_next(&self) -> Option<IntakeRecord> {
        let queue = self.inner.lock().expect("intake queue poisoned");
        queue.iter().find(|r| !r.consumed).cloned()
    }

    /// Remove a record after a terminal outcome. Idempotent: marking an
    /// unknown or already-consumed id is a no-op returning false.
    pub fn mark_consumed(&self, id: Uuid) -> bool {
        let mut queue = self.inner.lock().expect("intake queue poisoned");
        match queue.iter().position(|r| r.id == id) {
            Some(index) => {
                let mut record = queue.remove(index);
                record.consumed = true;
                debug!(id = %id, remaining = queue.len(), "Marked intake record consumed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("intake queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
