//! Webhook server entrypoint.
//!
//! Serves the WhatsApp webhook over HTTP and runs digests in the background. On Ctrl+C the
//! listener stops accepting requests and in-flight digests are allowed to finish.
use anyhow::{Context, Result};
use std::net::Ipv4Addr;
use std::sync::Arc;
use threadbrief::{
    api::{self, WebhookState},
    config,
    dispatch::JobDispatcher,
    logging,
    metrics::DigestMetrics,
    pipeline::DigestPipeline,
    reddit::{RedditClient, RedditSearcher},
    summarization::Summarizer,
    whatsapp::WhatsAppClient,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let config = config::load_config().context("failed to load configuration")?;

    let reddit = RedditClient::new(&config.search).context("failed to build Reddit client")?;
    let summarizer =
        Summarizer::from_config(&config.search).context("failed to build summarizer")?;
    let gateway =
        Arc::new(WhatsAppClient::new(&config).context("failed to build WhatsApp client")?);
    let metrics = Arc::new(DigestMetrics::new());

    let pipeline = Arc::new(DigestPipeline::new(
        Arc::new(RedditSearcher::new(reddit)),
        summarizer,
        gateway.clone(),
        metrics.clone(),
    ));
    let dispatcher = Arc::new(JobDispatcher::new(pipeline, config.max_concurrent_digests));

    let app = api::create_router(Arc::new(WebhookState {
        verify_token: config.webhook_verify_token.clone(),
        result_limit: config.digest_result_limit,
        gateway,
        dispatcher: dispatcher.clone(),
        metrics,
    }));

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.server_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.server_port))?;
    tracing::info!("Listening on http://0.0.0.0:{}", config.server_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    let pending = dispatcher.in_flight();
    if pending > 0 {
        tracing::info!(pending, "Waiting for in-flight digests; press Ctrl+C again to abort");
    }
    if dispatcher.drain_until(shutdown_signal()).await {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!(
            abandoned = dispatcher.in_flight(),
            "Second shutdown signal; abandoning in-flight digests"
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
