//! Pipeline configuration, built from environment variables.
//!
//! Missing *required* values abort startup — configuration problems are
//! never handled per-record.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;

use crate::error::ConfigError;

/// Default revision threshold: quotes above this amount always go to the
/// supervisor for review.
const DEFAULT_REVISION_THRESHOLD: u64 = 2_000_000;

/// Classification gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Endpoint the request payload is POSTed to.
    pub endpoint: String,
    /// Quotes with a total above this amount are flagged for review.
    pub revision_threshold: Decimal,
    /// Per-attempt request timeout.
    pub attempt_timeout: Duration,
    /// Maximum number of attempts (first try included).
    pub max_attempts: u32,
    /// Fixed delay between attempts; a small jitter is added on top.
    pub retry_delay: Duration,
}

/// SMTP settings for the notification transport.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub gateway: GatewayConfig,
    /// Escalations (needs-review drafts) are addressed here.
    pub supervisor_email: String,
    /// Dispatcher tick interval.
    pub dispatch_interval: Duration,
    /// Mailbox poll interval (independent, slower timer).
    pub mailbox_poll_interval: Duration,
    /// Spool directory for the file-spool mailbox connector.
    /// `None` disables mailbox intake.
    pub spool_dir: Option<PathBuf>,
    /// Where rendered pre-invoices land.
    pub invoices_dir: PathBuf,
    /// JSON Lines file the persistence sink appends to.
    pub sink_path: PathBuf,
    /// SMTP transport settings. `None` puts the notifier in dry-run mode.
    pub smtp: Option<SmtpConfig>,
}

impl PipelineConfig {
    /// Build config from environment variables.
    ///
    /// `GATEWAY_ENDPOINT` and `SUPERVISOR_EMAIL` are required; everything
    /// else has a default. SMTP is enabled only when `SMTP_HOST` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = require("GATEWAY_ENDPOINT", "URL of the pricing/classification service")?;
        let supervisor_email = require("SUPERVISOR_EMAIL", "address that receives escalations")?;

        let revision_threshold = match std::env::var("REVISION_THRESHOLD") {
            Ok(raw) => {
                Decimal::from_str(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                    key: "REVISION_THRESHOLD".into(),
                    message: e.to_string(),
                })?
            }
            Err(_) => Decimal::from(DEFAULT_REVISION_THRESHOLD),
        };

        let gateway = GatewayConfig {
            endpoint,
            revision_threshold,
            attempt_timeout: Duration::from_secs(parse_or("GATEWAY_TIMEOUT_SECS", 30)?),
            max_attempts: parse_or("GATEWAY_MAX_ATTEMPTS", 3)?,
            retry_delay: Duration::from_secs(parse_or("GATEWAY_RETRY_DELAY_SECS", 2)?),
        };

        let smtp = std::env::var("SMTP_HOST").ok().map(|host| SmtpConfig {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: SecretString::from(std::env::var("SMTP_PASSWORD").unwrap_or_default()),
            from_address: std::env::var("SMTP_FROM_ADDRESS")
                .unwrap_or_else(|_| std::env::var("SMTP_USERNAME").unwrap_or_default()),
        });

        Ok(Self {
            gateway,
            supervisor_email,
            dispatch_interval: Duration::from_secs(parse_or("DISPATCH_INTERVAL_SECS", 10)?),
            mailbox_poll_interval: Duration::from_secs(parse_or("MAILBOX_POLL_INTERVAL_SECS", 60)?),
            spool_dir: std::env::var("MAILBOX_SPOOL_DIR").ok().map(PathBuf::from),
            invoices_dir: std::env::var("INVOICES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/invoices")),
            sink_path: std::env::var("SINK_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/quotations.jsonl")),
            smtp,
        })
    }
}

fn require(key: &str, hint: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingRequired {
            key: key.into(),
            hint: hint.into(),
        }),
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.into(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
