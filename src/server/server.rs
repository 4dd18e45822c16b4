use anyhow::{Context, Result};
use std::time::Duration;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog_store::CatalogCounts;

use super::metrics::make_metrics_app;
use super::query_routes::make_songs_routes;
use super::state::{GuardedCatalogStore, GuardedSongsService, ServerState};
use super::{http_cache, log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub catalog: Option<CatalogCounts>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let store = state.catalog_store.clone();
    let catalog = match tokio::task::spawn_blocking(move || store.get_counts()).await {
        Ok(Ok(counts)) => Some(counts),
        Ok(Err(err)) => {
            warn!("Failed to count catalog items: {:#}", err);
            None
        }
        Err(err) => {
            warn!("Catalog count task failed: {}", err);
            None
        }
    };
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        catalog,
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    songs_service: GuardedSongsService,
) -> Router {
    let state = ServerState {
        config: config.clone(),
        start_time: std::time::Instant::now(),
        catalog_store,
        songs_service,
        hash: env!("GIT_HASH").to_string(),
    };

    let query_routes = make_songs_routes(state.clone()).layer(middleware::from_fn_with_state(
        config.content_cache_age_sec,
        http_cache,
    ));

    let home_router: Router = Router::new().route("/", get(home)).with_state(state.clone());

    home_router
        .nest("/v1", query_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

pub async fn run_server(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    songs_service: GuardedSongsService,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, catalog_store, songs_service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            tracing::error!("Metrics server stopped: {}", err);
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
