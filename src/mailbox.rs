//! Mailbox intake: the connector contract, a file-spool connector, and
//! the polling task that feeds the ingestion queue.
//!
//! The connector that authenticates to a mail server, parses MIME, and
//! extracts attachment text lives outside this crate; the core only sees
//! plain `RawMessage` records. Polling runs on its own, slower timer and
//! only ever appends to the queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::MailboxError;
use crate::intake::{IntakeQueue, RawMessage, normalize_mail};

/// Source of unseen inbound messages.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    /// Fetch messages not yet delivered to the core. A message returned
    /// here must not be returned again.
    async fn fetch_unseen(&self) -> Result<Vec<RawMessage>, MailboxError>;
}

/// File-spool connector: reads `*.json` `RawMessage` files from a spool
/// directory, deleting each file once read.
///
/// Stands in for the external mailbox process, which drops parsed
/// messages into the spool. Malformed files are renamed aside so they
/// are not re-read every cycle.
pub struct SpoolConnector {
    dir: PathBuf,
}

impl SpoolConnector {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl MailboxConnector for SpoolConnector {
    async fn fetch_unseen(&self) -> Result<Vec<RawMessage>, MailboxError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        // Deterministic pickup order; queue ordering is by receive date
        // anyway.
        paths.sort();

        let mut messages = Vec::new();
        for path in paths {
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<RawMessage>(&bytes) {
                Ok(message) => {
                    tokio::fs::remove_file(&path).await?;
                    messages.push(message);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed spool file, setting aside");
                    let aside = path.with_extension("malformed");
                    if let Err(rename_err) = tokio::fs::rename(&path, &aside).await {
                        return Err(MailboxError::Malformed {
                            path,
                            reason: format!("{e}; also failed to set aside: {rename_err}"),
                        });
                    }
                }
            }
        }
        Ok(messages)
    }
}

/// Spawn the mailbox polling task.
///
/// Each cycle fetches unseen messages, normalizes them, and appends to
/// the queue. Fetch errors are logged and the cycle skipped — the next
/// tick retries. Returns a `JoinHandle` and a shutdown flag.
pub fn spawn_mailbox_poller(
    connector: Arc<dyn MailboxConnector>,
    queue: Arc<IntakeQueue>,
    interval: Duration,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("Mailbox poller started — polling every {:?}", interval);
        let mut tick = tokio::time::interval(interval);

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Mailbox poller shutting down");
                return;
            }

            match connector.fetch_unseen().await {
                Ok(messages) => {
                    if messages.is_empty() {
                        continue;
                    }
                    debug!(count = messages.len(), "Fetched unseen messages");
                    for message in messages {
                        let record = normalize_mail(message);
                        queue.enqueue(record);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Mailbox fetch failed, will retry next cycle");
                }
            }
        }
    });

    (handle, shutdown_flag)
}
