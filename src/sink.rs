//! JSON Lines persistence sink.
//!
//! Appends one record per saved draft. The relational store behind the
//! wider application is not this crate's concern; the sink contract only
//! requires durable, inspectable records of drafts and their status.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::emitter::PersistenceSink;
use crate::error::EmitError;
use crate::pipeline::types::{QuotationDraft, QuoteStatus};

/// One persisted quotation row.
#[derive(Debug, Serialize)]
struct StoredQuotation<'a> {
    id: Uuid,
    source_record_id: Uuid,
    status: QuoteStatus,
    saved_at: DateTime<Utc>,
    draft: &'a QuotationDraft,
}

/// Appends drafts to a JSON Lines file.
pub struct JsonlSink {
    path: PathBuf,
    // Serializes appends so concurrent saves cannot interleave lines.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn persist_err(&self, record_id: Uuid, reason: impl std::fmt::Display) -> EmitError {
        EmitError::Persist {
            record_id,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl PersistenceSink for JsonlSink {
    async fn save(
        &self,
        source_record_id: Uuid,
        draft: &QuotationDraft,
        status: QuoteStatus,
    ) -> Result<Uuid, EmitError> {
        let id = Uuid::new_v4();
        let row = StoredQuotation {
            id,
            source_record_id,
            status,
            saved_at: Utc::now(),
            draft,
        };
        let mut line = serde_json::to_string(&row)
            .map_err(|e| self.persist_err(source_record_id, e))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.persist_err(source_record_id, e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.persist_err(source_record_id, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.persist_err(source_record_id, e))?;
        file.flush()
            .await
            .map_err(|e| self.persist_err(source_record_id, e))?;

        debug!(id = %id, source = %source_record_id, status = ?status, "Draft persisted");
        Ok(id)
    }
}
