//! Marquee API Server
//!
//! REST API server for authentication and sessions of the Marquee catalog.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use marquee_api::{create_router, state::AppState};
use marquee_core::{config::AppConfig, db, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "marquee_api={level},marquee_core={level},tower_http={level}",
            level = logging.level
        ))
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    // Refuse to start without usable signing secrets
    config
        .auth
        .validate()
        .context("Invalid authentication configuration")?;

    let pool = db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    db::init_schema(&pool)
        .await
        .context("Failed to initialize schema")?;

    let addr = config.server.bind_addr();

    let state = Arc::new(
        AppState::with_pool(config, pool.clone()).context("Failed to build application state")?,
    );

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Marquee API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            state.set_ready(false);
        })
        .await?;

    db::close(&pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
