//! Scheduled dispatcher — drains at most one intake record per tick.
//!
//! Per tick: peek the queue head, classify, route, emit, and only then
//! mark the record consumed. Any failure before consumption leaves the
//! record head-of-queue for the next tick — a blunt at-least-once
//! strategy: a crash between notification and consumption reprocesses
//! the record, and notification is not transactional with persistence.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::emitter::OutcomeEmitter;
use crate::intake::IntakeQueue;
use crate::pipeline::types::{Classifier, ProcessingOutcome};
use crate::routing;

/// Single-flight consumer of the ingestion queue.
///
/// Holds its collaborators by explicit construction — queue, classifier,
/// emitter — and processes strictly one record per tick to bound load on
/// the external classifier and keep behavior deterministic.
pub struct Dispatcher {
    queue: Arc<IntakeQueue>,
    classifier: Arc<dyn Classifier>,
    emitter: OutcomeEmitter,
    supervisor_address: String,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<IntakeQueue>,
        classifier: Arc<dyn Classifier>,
        emitter: OutcomeEmitter,
        supervisor_address: String,
    ) -> Self {
        Self {
            queue,
            classifier,
            emitter,
            supervisor_address,
        }
    }

    /// Run one tick: claim the head record, run the full pipeline, and
    /// consume the record on a terminal outcome.
    ///
    /// Returns the outcome when a record was fully processed, `None` on
    /// an idle tick or when the attempt is left for retry.
    pub async fn tick(&self) -> Option<ProcessingOutcome> {
        let record = self.queue.peek_next()?;

        // Reentrancy guard; peek_next already skips consumed records.
        if record.consumed {
            warn!(id = %record.id, "Claimed record already consumed, skipping");
            return None;
        }

        debug!(
            id = %record.id,
            requester = %record.requester_email,
            queued = self.queue.len(),
            "Claimed intake record"
        );

        let draft = self.classifier.classify(&record).await;
        let route = routing::route(&draft, &self.supervisor_address);
        let reference = reference_for(record.id);

        match self
            .emitter
            .emit(record.id, &draft, &route.destination, route.is_escalation, &reference)
            .await
        {
            Ok(outcome) => {
                self.queue.mark_consumed(record.id);
                info!(
                    id = %record.id,
                    reference,
                    destination = %outcome.destination,
                    escalation = route.is_escalation,
                    "Record processed and consumed"
                );
                Some(outcome)
            }
            Err(e) => {
                // Not consumed: the record stays head-of-queue and the
                // whole attempt is retried next tick.
                error!(id = %record.id, error = %e, "Emit failed, record left for retry");
                None
            }
        }
    }
}

/// Short human-readable reference derived from the record id, used for
/// document naming and message subjects.
fn reference_for(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("QF-{}", simple[..8].to_uppercase())
}

/// Spawn the dispatcher loop.
///
/// Ticks never overlap: the loop awaits each tick inline. A panicking
/// tick is caught and logged, and the claimed record — still unconsumed —
/// is retried on the next tick. Returns a `JoinHandle` and shutdown flag.
pub fn spawn_dispatcher(
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("Dispatcher started — ticking every {:?}", interval);
        let mut tick = tokio::time::interval(interval);

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Dispatcher shutting down");
                return;
            }

            if let Err(panic) = AssertUnwindSafe(dispatcher.tick()).catch_unwind().await {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(panic = %message, "Dispatcher tick panicked, record left for retry");
            }
        }
    });

    (handle, shutdown_flag)
}
