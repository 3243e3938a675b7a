// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;
#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::session::DashboardSession;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::http_client::HttpPredictionClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    health_check, list_locations, refresh, reload_locations, select_location, set_auto_refresh,
    status,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Create prediction client (infrastructure layer)
    let client = Arc::new(HttpPredictionClient::new(
        &config.service.base_url,
        config.service.mode,
        config.request_timeout(),
    )?);

    // Start the dashboard session (application layer)
    let (session, session_task) = DashboardSession::spawn(client, config.session_settings());

    // Create application state
    let state = Arc::new(AppState {
        session: session.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(status))
        .route("/locations", get(list_locations))
        .route("/locations/reload", post(reload_locations))
        .route("/refresh", post(refresh))
        .route("/auto-refresh", put(set_auto_refresh))
        .route("/location", put(select_location))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(
        %addr,
        service = %config.service.base_url,
        mode = ?config.service.mode,
        "starting flood-watch dashboard"
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "failed to listen for shutdown signal");
            }
        })
        .await?;

    // Session may already be gone; either way the task is joined below.
    let _ = session.shutdown().await;
    session_task.await?;

    Ok(())
}
