//! Error types for Quoteflow.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),
}

/// Configuration-related errors. All of these are fatal at startup —
/// nothing in this module is handled per-record.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Classification gateway errors. Transient by taxonomy: the client
/// retries these locally and degrades after the retry budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Gateway transport failed: {0}")]
    Transport(String),

    #[error("Gateway returned HTTP {status}")]
    Status { status: u16 },

    #[error("Gateway response could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether this failure was a timeout (the request may still be
    /// answered later) as opposed to a hard error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Mailbox connector errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Mailbox fetch failed: {0}")]
    Fetch(String),

    #[error("Malformed message in {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome emission errors.
///
/// `Render` is recovered inside the emitter (degrade to a notification
/// without attachment); `Notify` and `Persist` surface to the dispatcher,
/// which leaves the record unconsumed so the tick is retried.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("Document render failed: {0}")]
    Render(String),

    #[error("Notification dispatch to {to} failed: {reason}")]
    Notify { to: String, reason: String },

    #[error("Persisting draft for record {record_id} failed: {reason}")]
    Persist { record_id: uuid::Uuid, reason: String },
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
