mod error;
mod fetcher;
mod handlers;
mod models;
mod refresh;
mod scheduler;
mod selection;
mod state;
mod stats;
mod view;

use anyhow::Context as _;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tera::Tera;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::fetcher::UpstreamClient;
use crate::state::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    info!("Using API URL: {}", config.api_url);
    info!("API key configured");

    let upstream = UpstreamClient::new(&config.api_url, &config.api_key, config.request_timeout)
        .context("failed to build upstream client")?;
    let tera = Tera::new(&config.template_glob)
        .with_context(|| format!("failed to load templates from {}", config.template_glob))?;
    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState::new(config, tera, upstream));

    if let Err(e) = state.refresh().await {
        warn!("Initial load failed, will retry on the next refresh: {}", e);
    }
    state.start_auto_refresh();

    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!("SitePulse running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.stop_auto_refresh();
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/dashboard", get(handlers::api_dashboard))
        .route("/api/sites", get(handlers::api_sites))
        .route("/api/sites/{site_id}/devices", get(handlers::api_site_devices))
        .route("/api/sites/{site_id}/clients", get(handlers::api_site_clients))
        .route("/refresh", post(handlers::refresh_now))
        .route("/selection/all", post(handlers::select_all))
        .route("/selection/none", post(handlers::select_none))
        .route("/selection/online", post(handlers::select_online))
        .route("/selection/toggle/{site_id}", post(handlers::toggle_site))
        .route("/sites/{site_id}/collapse", post(handlers::toggle_site_collapsed))
        .route("/filter/toggle", post(handlers::toggle_filter_panel))
        .route("/auto-refresh/start", post(handlers::start_auto_refresh))
        .route("/auto-refresh/stop", post(handlers::stop_auto_refresh))
        .nest_service("/static", static_dir)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
