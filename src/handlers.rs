use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect},
};
use serde_json::Value;
use std::sync::Arc;
use tera::Context;
use tokio::time::Instant;
use tracing::error;

use crate::error::DashboardError;
use crate::state::AppState;
use crate::view::DashboardView;

fn render_template(
    tera: &tera::Tera,
    template: &str,
    context: &Context,
) -> Result<Html<String>, (StatusCode, &'static str)> {
    tera.render(template, context).map(Html).map_err(|e| {
        error!("Template render error for '{}': {}", template, e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Render error")
    })
}

async fn dashboard_view(state: &AppState) -> DashboardView {
    let now = Instant::now();
    let mut session = state.session.write().await;
    session.mark_notification_shown(now);
    DashboardView::build(
        &session,
        now,
        state.config.notification_ttl,
        state.auto_refresh.seconds_until_refresh(),
        state.config.refresh_interval,
    )
}

async fn passthrough(
    state: &AppState,
    segments: &[&str],
) -> Result<Json<Value>, DashboardError> {
    state.upstream.get_json(segments).await.map(Json).map_err(|e| {
        error!(path = %segments.join("/"), error = %e, "upstream passthrough failed");
        e
    })
}

/// GET / - Dashboard for the selected sites.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = dashboard_view(&state).await;
    let mut context = Context::new();
    context.insert("view", &view);
    render_template(&state.tera, "dashboard.html", &context)
}

/// GET /api/dashboard - The same data the dashboard page renders.
pub async fn api_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(dashboard_view(&state).await)
}

/// GET /api/sites - Upstream site list, unchanged.
pub async fn api_sites(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, DashboardError> {
    passthrough(&state, &["sites"]).await
}

/// GET /api/sites/{site_id}/devices
pub async fn api_site_devices(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<Json<Value>, DashboardError> {
    passthrough(&state, &["sites", &site_id, "devices"]).await
}

/// GET /api/sites/{site_id}/clients
pub async fn api_site_clients(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<Json<Value>, DashboardError> {
    passthrough(&state, &["sites", &site_id, "clients"]).await
}

/// POST /refresh - Run a cycle immediately.
pub async fn refresh_now(State(state): State<Arc<AppState>>) -> Redirect {
    // a failed cycle is shown from the session's last error
    let _ = state.refresh().await;
    Redirect::to("/")
}

/// POST /selection/all
pub async fn select_all(State(state): State<Arc<AppState>>) -> Redirect {
    let mut session = state.session.write().await;
    let (selection, snapshot) = session.selection_mut();
    selection.select_all(snapshot);
    Redirect::to("/")
}

/// POST /selection/none
pub async fn select_none(State(state): State<Arc<AppState>>) -> Redirect {
    let mut session = state.session.write().await;
    let (selection, _) = session.selection_mut();
    selection.select_none();
    Redirect::to("/")
}

/// POST /selection/online
pub async fn select_online(State(state): State<Arc<AppState>>) -> Redirect {
    let mut session = state.session.write().await;
    let (selection, snapshot) = session.selection_mut();
    selection.select_online(snapshot);
    Redirect::to("/")
}

/// POST /selection/toggle/{site_id}
pub async fn toggle_site(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Redirect {
    let mut session = state.session.write().await;
    let (selection, _) = session.selection_mut();
    selection.toggle(&site_id);
    Redirect::to("/")
}

/// POST /sites/{site_id}/collapse - Collapse or expand one site card.
pub async fn toggle_site_collapsed(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Redirect {
    state.session.write().await.toggle_collapsed(&site_id);
    Redirect::to("/")
}

/// POST /filter/toggle - Show or hide the site filter list.
pub async fn toggle_filter_panel(State(state): State<Arc<AppState>>) -> Redirect {
    state.session.write().await.toggle_filter_panel();
    Redirect::to("/")
}

/// POST /auto-refresh/start
pub async fn start_auto_refresh(State(state): State<Arc<AppState>>) -> Redirect {
    state.start_auto_refresh();
    Redirect::to("/")
}

/// POST /auto-refresh/stop
pub async fn stop_auto_refresh(State(state): State<Arc<AppState>>) -> Redirect {
    state.stop_auto_refresh();
    Redirect::to("/")
}
