//! End-to-end dispatcher behavior with stub collaborators: single-flight
//! ticks, consumption semantics, escalation routing, and retry-on-failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use quoteflow::emitter::{
    DocumentRenderer, NotificationTransport, OutcomeEmitter, PersistenceSink,
};
use quoteflow::error::EmitError;
use quoteflow::intake::IntakeQueue;
use quoteflow::pipeline::Dispatcher;
use quoteflow::pipeline::types::{
    Classifier, IntakeRecord, LineItem, QuotationDraft, QuoteStatus,
};

const SUPERVISOR: &str = "supervisor@example.com";

// ── Stub collaborators ──────────────────────────────────────────────

/// Returns a canned draft per call; counts invocations.
struct StubClassifier {
    drafts: Mutex<Vec<QuotationDraft>>,
    calls: AtomicUsize,
}

impl StubClassifier {
    fn new(drafts: Vec<QuotationDraft>) -> Arc<Self> {
        Arc::new(Self {
            drafts: Mutex::new(drafts),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, _intake: &IntakeRecord) -> QuotationDraft {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut drafts = self.drafts.lock().unwrap();
        assert!(!drafts.is_empty(), "classifier called more often than scripted");
        drafts.remove(0)
    }
}

struct StubRenderer;

#[async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render(
        &self,
        reference: &str,
        _draft: &QuotationDraft,
    ) -> Result<PathBuf, EmitError> {
        Ok(PathBuf::from(format!("/tmp/prefatura-{reference}.html")))
    }
}

#[derive(Default)]
struct RecordingTransport {
    fail: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        _body: &str,
        _attachment: Option<&Path>,
    ) -> Result<(), EmitError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmitError::Notify {
                to: to.into(),
                reason: "smtp down".into(),
            });
        }
        self.sent.lock().unwrap().push((to.into(), subject.into()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    saved: Mutex<Vec<(Uuid, QuoteStatus)>>,
}

#[async_trait]
impl PersistenceSink for RecordingSink {
    async fn save(
        &self,
        source_record_id: Uuid,
        _draft: &QuotationDraft,
        status: QuoteStatus,
    ) -> Result<Uuid, EmitError> {
        self.saved.lock().unwrap().push((source_record_id, status));
        Ok(Uuid::new_v4())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn record(name: &str, offset_secs: i64) -> IntakeRecord {
    IntakeRecord {
        id: Uuid::new_v4(),
        received_at: Utc::now() + Duration::seconds(offset_secs),
        requester_name: name.into(),
        requester_email: format!("{}@example.com", name.to_lowercase()),
        free_text: "quote please".into(),
        attachment_text: String::new(),
        consumed: false,
    }
}

fn draft(email: &str, total: Decimal, needs_review: bool) -> QuotationDraft {
    QuotationDraft {
        valid: true,
        client_name: "Client".into(),
        client_email: email.into(),
        line_items: vec![LineItem {
            description: "Laptop".into(),
            quantity: 2,
            unit_price: dec!(350000),
        }],
        total,
        needs_review,
        notes: String::new(),
    }
}

struct Harness {
    queue: Arc<IntakeQueue>,
    classifier: Arc<StubClassifier>,
    transport: Arc<RecordingTransport>,
    sink: Arc<RecordingSink>,
    dispatcher: Dispatcher,
}

fn harness(drafts: Vec<QuotationDraft>) -> Harness {
    let queue = Arc::new(IntakeQueue::new());
    let classifier = StubClassifier::new(drafts);
    let transport = Arc::new(RecordingTransport::default());
    let sink = Arc::new(RecordingSink::default());
    let emitter = OutcomeEmitter::new(
        Arc::new(StubRenderer),
        Arc::clone(&transport) as Arc<dyn NotificationTransport>,
        Arc::clone(&sink) as Arc<dyn PersistenceSink>,
    );
    let dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        Arc::clone(&classifier) as Arc<dyn Classifier>,
        emitter,
        SUPERVISOR.into(),
    );
    Harness {
        queue,
        classifier,
        transport,
        sink,
        dispatcher,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn idle_tick_does_nothing() {
    let h = harness(vec![]);

    assert!(h.dispatcher.tick().await.is_none());

    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
    assert!(h.transport.sent.lock().unwrap().is_empty());
    assert!(h.sink.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn clean_draft_goes_to_client_and_is_consumed() {
    let h = harness(vec![draft("alice@example.com", dec!(700000), false)]);
    let r = record("Alice", 0);
    let id = r.id;
    h.queue.enqueue(r);

    let outcome = h.dispatcher.tick().await.expect("record processed");

    assert_eq!(outcome.record_id, id);
    assert_eq!(outcome.destination, "alice@example.com");
    assert!(h.queue.is_empty());
    assert_eq!(h.sink.saved.lock().unwrap()[0], (id, QuoteStatus::Completed));

    // Nothing left: the next tick is idle.
    assert!(h.dispatcher.tick().await.is_none());
    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn over_threshold_draft_escalates_to_supervisor() {
    // Threshold 2,000,000; total 2,500,000 arrives flagged from
    // normalization even though the classifier itself did not object.
    let h = harness(vec![draft("alice@example.com", dec!(2500000), true)]);
    h.queue.enqueue(record("Alice", 0));

    let outcome = h.dispatcher.tick().await.expect("record processed");

    assert_eq!(outcome.destination, SUPERVISOR);
    let sent = h.transport.sent.lock().unwrap();
    assert_eq!(sent[0].0, SUPERVISOR);
    assert!(sent[0].1.contains("requires review"));
    assert_eq!(h.sink.saved.lock().unwrap()[0].1, QuoteStatus::PendingReview);
}

#[tokio::test]
async fn notify_failure_leaves_record_for_the_next_tick() {
    let h = harness(vec![
        draft("alice@example.com", dec!(700000), false),
        draft("alice@example.com", dec!(700000), false),
    ]);
    h.queue.enqueue(record("Alice", 0));
    h.transport.fail.store(true, Ordering::SeqCst);

    // First tick fails downstream: record must stay queued, unconsumed.
    assert!(h.dispatcher.tick().await.is_none());
    assert_eq!(h.queue.len(), 1);
    assert!(h.sink.saved.lock().unwrap().is_empty());

    // Transport recovers; the retried tick completes and consumes.
    h.transport.fail.store(false, Ordering::SeqCst);
    assert!(h.dispatcher.tick().await.is_some());
    assert!(h.queue.is_empty());
    assert_eq!(h.sink.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn records_are_processed_in_receipt_order_one_per_tick() {
    let h = harness(vec![
        draft("early@example.com", dec!(1000), false),
        draft("late@example.com", dec!(1000), false),
    ]);
    // Enqueue out of order; the queue re-sorts by receive time.
    h.queue.enqueue(record("Late", 60));
    h.queue.enqueue(record("Early", -60));

    let first = h.dispatcher.tick().await.unwrap();
    assert_eq!(h.queue.len(), 1); // strictly one record per tick
    let second = h.dispatcher.tick().await.unwrap();

    // Drafts are scripted in receipt order, so the classifier saw Early
    // first.
    assert_eq!(first.destination, "early@example.com");
    assert_eq!(second.destination, "late@example.com");
    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalid_draft_yields_need_more_info_to_client() {
    let h = harness(vec![QuotationDraft {
        valid: false,
        client_name: "Bob".into(),
        client_email: "bob@example.com".into(),
        line_items: vec![LineItem::unspecified()],
        total: Decimal::ZERO,
        needs_review: false,
        notes: "No items identified in the message.".into(),
    }]);
    h.queue.enqueue(record("Bob", 0));

    let outcome = h.dispatcher.tick().await.unwrap();

    // Uninterpretable input goes back to the sender, never to the
    // supervisor.
    assert_eq!(outcome.destination, "bob@example.com");
    let sent = h.transport.sent.lock().unwrap();
    assert!(sent[0].1.contains("more information"));
    assert_eq!(h.sink.saved.lock().unwrap()[0].1, QuoteStatus::Rejected);
}
