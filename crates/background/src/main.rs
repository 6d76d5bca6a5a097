//! VidSum background host
//!
//! Speaks newline-delimited JSON on stdin/stdout; logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vidsum_background::transport::{self, ChannelNotifier};
use vidsum_background::AppContext;
use vidsum_infra::{config, init_tracing};

const INBOX_CAPACITY: usize = 64;
const OUTBOUND_CAPACITY: usize = 256;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = dotenvy::dotenv();

    let config = config::load()?;
    init_tracing(&config.logging)?;

    match env_file {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => info!("No .env file loaded: {}", e),
    }

    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let notifier = Arc::new(ChannelNotifier::new(outbound_tx.clone()));
    let ctx = AppContext::new(config, notifier)?;

    let mut scheduler = ctx.scheduler();
    scheduler.on_startup().await;
    scheduler.start().await?;

    let shutdown = CancellationToken::new();
    let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);

    let serve = tokio::spawn({
        let dispatcher = ctx.dispatcher.clone();
        let shutdown = shutdown.clone();
        async move { dispatcher.serve(inbox_rx, shutdown).await }
    });
    let writer = tokio::spawn(transport::write_frames(tokio::io::stdout(), outbound_rx));

    tokio::select! {
        read = transport::read_requests(tokio::io::stdin(), inbox_tx, outbound_tx, shutdown.clone()) => {
            if let Err(e) = read {
                warn!(error = %e, "Request stream failed");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for interrupt");
            }
            info!("Interrupt received");
        }
    }

    info!("Shutting down background host");
    shutdown.cancel();

    if let Err(e) = scheduler.stop().await {
        warn!(error = %e, "Lifecycle scheduler did not stop cleanly");
    }
    if let Err(e) = serve.await {
        warn!(error = %e, "Dispatcher task failed");
    }

    drop(scheduler);
    drop(ctx);
    match tokio::time::timeout(DRAIN_TIMEOUT, writer).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "Output stream failed"),
        Ok(Err(e)) => warn!(error = %e, "Writer task failed"),
        Err(_) => warn!("Pending output was not drained in time"),
    }

    info!("Background host stopped");
    Ok(())
}
