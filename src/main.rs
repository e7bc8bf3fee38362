use std::sync::Arc;
use std::sync::atomic::Ordering;

use quoteflow::config::PipelineConfig;
use quoteflow::emitter::OutcomeEmitter;
use quoteflow::gateway::GatewayClient;
use quoteflow::intake::IntakeQueue;
use quoteflow::mailbox::{self, SpoolConnector};
use quoteflow::notify::SmtpNotifier;
use quoteflow::pipeline::types::Classifier;
use quoteflow::pipeline::{Dispatcher, spawn_dispatcher};
use quoteflow::render::HtmlInvoiceRenderer;
use quoteflow::sink::JsonlSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Configuration problems are fatal here, never handled per-record.
    let config = PipelineConfig::from_env()?;

    eprintln!("Quoteflow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Gateway: {}", config.gateway.endpoint);
    eprintln!("   Supervisor: {}", config.supervisor_email);
    eprintln!("   Revision threshold: {} Kz", config.gateway.revision_threshold);
    eprintln!("   Dispatch interval: {:?}", config.dispatch_interval);
    eprintln!(
        "   SMTP: {}",
        config
            .smtp
            .as_ref()
            .map(|s| s.host.clone())
            .unwrap_or_else(|| "disabled (dry-run)".to_string())
    );

    let queue = Arc::new(IntakeQueue::new());

    let classifier: Arc<dyn Classifier> = Arc::new(GatewayClient::new(config.gateway.clone())?);

    let emitter = OutcomeEmitter::new(
        Arc::new(HtmlInvoiceRenderer::new(config.invoices_dir.clone())),
        Arc::new(SmtpNotifier::new(config.smtp.clone())),
        Arc::new(JsonlSink::new(config.sink_path.clone())),
    );

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&queue),
        classifier,
        emitter,
        config.supervisor_email.clone(),
    ));
    let (dispatch_handle, dispatch_shutdown) =
        spawn_dispatcher(dispatcher, config.dispatch_interval);

    // Mailbox intake is optional: without a spool dir the pipeline only
    // ever sees what other intakes enqueue.
    let mailbox_task = match &config.spool_dir {
        Some(dir) => {
            eprintln!("   Mailbox spool: {}", dir.display());
            let connector = Arc::new(SpoolConnector::new(dir.clone()));
            Some(mailbox::spawn_mailbox_poller(
                connector,
                Arc::clone(&queue),
                config.mailbox_poll_interval,
            ))
        }
        None => {
            eprintln!("   Mailbox spool: disabled");
            None
        }
    };

    tokio::signal::ctrl_c().await?;
    eprintln!("Shutting down...");

    dispatch_shutdown.store(true, Ordering::Relaxed);
    if let Some((handle, shutdown)) = mailbox_task {
        shutdown.store(true, Ordering::Relaxed);
        handle.abort();
    }
    dispatch_handle.abort();

    Ok(())
}
