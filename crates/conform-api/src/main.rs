//! # conform-api: Binary Entry Point
//!
//! Serves the route manifest named by `CONFORM_MANIFEST` as a
//! contract-checked stub API. Binds to `PORT` (default 8080).

use anyhow::Context;
use axum::Router;
use conform_api::manifest::Manifest;
use conform_api::middleware::metrics::install_recorder;
use conform_api::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let mut state = AppState::new(config.clone());
    if config.metrics_enabled {
        let handle = install_recorder().context("failed to install Prometheus recorder")?;
        state = state.with_metrics(handle);
    }

    let routes = match &config.manifest {
        Some(path) => {
            let manifest = Manifest::load(path)
                .with_context(|| format!("failed to load manifest {}", path.display()))?;
            let router = manifest
                .router(&state.contract_guard())
                .with_context(|| format!("failed to compile manifest {}", path.display()))?;
            tracing::info!(
                routes = manifest.routes.len(),
                manifest = %path.display(),
                "route manifest compiled"
            );
            router
        }
        None => {
            tracing::warn!("CONFORM_MANIFEST is not set; serving health probes only");
            Router::new()
        }
    };

    let app = conform_api::app(state, routes);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("conform API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
