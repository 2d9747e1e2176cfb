//! HTTP server startup.
//!
//! [`serve`] checks credentials, binds the listener, and builds the pipeline in
//! the background. Requests arriving before the pipeline is ready get a 503;
//! if building it fails the server shuts down and `serve` returns the error.

pub mod handlers;
pub mod router;
pub mod state;

use anyhow::Result;
use std::sync::Arc;

use crate::config::TarotConfig;
use crate::pipeline::TarotPipeline;
use state::{AppState, Readiness};

pub async fn serve(config: TarotConfig) -> Result<()> {
    // Fail fast on missing credentials, before anything binds.
    let keys = config.api_keys()?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new());
    let app = router::router(Arc::clone(&state), &config.server.cors_origins);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "tarot API listening at http://{bind_addr}");

    let init_state = Arc::clone(&state);
    tokio::spawn(async move {
        tracing::info!("loading tarot index and model clients");
        match TarotPipeline::initialize(&config, keys).await {
            Ok(pipeline) => {
                init_state.mark_ready(Arc::new(pipeline));
                tracing::info!("tarot pipeline ready");
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "startup failed");
                init_state.mark_failed(format!("{e:#}"));
            }
        }
    });

    let shutdown_state = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "failed to listen for ctrl-c");
                        std::future::pending::<()>().await;
                    }
                    tracing::info!("shutting down tarot API");
                }
                reason = shutdown_state.startup_failed() => {
                    tracing::info!(%reason, "shutting down after failed startup");
                }
            }
        })
        .await?;

    if let Readiness::Failed(reason) = state.readiness() {
        anyhow::bail!("startup failed: {reason}");
    }
    Ok(())
}
