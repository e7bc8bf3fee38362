//! SMTP notification transport (lettre).
//!
//! When no SMTP configuration is present the notifier runs dry: it logs
//! the message and reports success, which keeps the pipeline exercisable
//! in development without a mail account.

use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::SmtpConfig;
use crate::emitter::NotificationTransport;
use crate::error::EmitError;

/// SMTP-backed notification transport.
pub struct SmtpNotifier {
    config: Option<SmtpConfig>,
}

impl SmtpNotifier {
    pub fn new(config: Option<SmtpConfig>) -> Self {
        if config.is_none() {
            warn!("No SMTP configuration — notifications will be logged, not sent");
        }
        Self { config }
    }

    fn notify_err(to: &str, reason: impl std::fmt::Display) -> EmitError {
        EmitError::Notify {
            to: to.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl NotificationTransport for SmtpNotifier {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> Result<(), EmitError> {
        let Some(config) = &self.config else {
            info!(to, subject, attachment = attachment.is_some(), "Dry-run notification");
            return Ok(());
        };

        // A produced-but-unreadable attachment degrades to body-only;
        // the message still goes out.
        let attachment_part = match attachment {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "document".to_string());
                    Some(Attachment::new(filename).body(bytes, content_type_for(path)))
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Attachment unreadable, sending without it");
                    None
                }
            },
            None => None,
        };

        let builder = Message::builder()
            .from(config.from_address.parse().map_err(|e| Self::notify_err(to, format!("invalid from address: {e}")))?)
            .to(to.parse().map_err(|e| Self::notify_err(to, format!("invalid to address: {e}")))?)
            .subject(subject);

        let email = match attachment_part {
            Some(part) => builder
                .multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(body.to_string()))
                        .singlepart(part),
                )
                .map_err(|e| Self::notify_err(to, format!("building message: {e}")))?,
            None => builder
                .body(body.to_string())
                .map_err(|e| Self::notify_err(to, format!("building message: {e}")))?,
        };

        let config = config.clone();
        let to_owned = to.to_string();
        tokio::task::spawn_blocking(move || {
            let creds = Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            );
            let transport = SmtpTransport::relay(&config.host)
                .map_err(|e| Self::notify_err(&to_owned, format!("SMTP relay: {e}")))?
                .port(config.port)
                .credentials(creds)
                .build();

            transport
                .send(&email)
                .map_err(|e| Self::notify_err(&to_owned, format!("SMTP send: {e}")))?;
            Ok::<_, EmitError>(())
        })
        .await
        .map_err(|e| Self::notify_err(to, format!("send task panicked: {e}")))??;

        info!(to, subject, "Notification sent");
        Ok(())
    }
}

fn content_type_for(path: &Path) -> ContentType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => ContentType::TEXT_HTML,
        Some("pdf") => ContentType::parse("application/pdf").unwrap_or(ContentType::TEXT_PLAIN),
        Some("txt") => ContentType::TEXT_PLAIN,
        _ => ContentType::parse("application/octet-stream").unwrap_or(ContentType::TEXT_PLAIN),
    }
}
