mod access;
mod config;
mod db;
mod errors;
mod evaluation;
mod models;
mod records;
mod routes;
mod rubric;
mod scoring;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, pool_size};
use crate::evaluation::pg_store::PgEvaluationStore;
use crate::evaluation::service::EvaluationService;
use crate::records::pg_store::PgRecordStore;
use crate::routes::build_router;
use crate::rubric::provider::PgConfigProvider;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recruit API v{}", env!("CARGO_PKG_VERSION"));

    let seed = config.initial_scoring_config()?;
    let shutdown = CancellationToken::new();

    let state = match &config.database_url {
        Some(url) => {
            let db = create_pool(url, pool_size(config.batch_concurrency)).await?;
            let rubric = PgConfigProvider::bootstrap(db.clone(), seed).await?;
            AppState::assemble(
                config.clone(),
                Arc::new(PgRecordStore::new(db.clone())),
                Arc::new(PgEvaluationStore::new(db)),
                Arc::new(rubric),
                shutdown.clone(),
            )
        }
        None => {
            warn!("DATABASE_URL not set; records and evaluations are kept in memory only");
            AppState::in_memory(config.clone(), seed, shutdown.clone())
        }
    };

    let active = state.rubric.get_active().await?;
    info!(
        "Scoring configuration {} active ({} categories)",
        active.version,
        active.config.categories.len()
    );

    tokio::spawn(log_store_changes(state.evaluations.clone(), shutdown.clone()));

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C and cancels the root token so running batches stop starting candidates.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown requested");
    shutdown.cancel();
}

/// Logs every store write; readers that cache evaluations re-fetch on these.
async fn log_store_changes(service: Arc<EvaluationService>, shutdown: CancellationToken) {
    let mut changes = service.subscribe();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            change = changes.recv() => match change {
                Ok(change) => debug!(?change, "store changed"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "store change listener lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}
