// src/api.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::ExporterConfig;
use crate::ingest::{StatusBoard, StatusSnapshot};
use crate::merge::Merger;
use crate::web;

/// Route layout taken from configuration.
#[derive(Debug, Clone)]
pub struct Routes {
    pub metrics_path: String,
    pub enable_html: bool,
    pub html_path: String,
}

impl From<&ExporterConfig> for Routes {
    fn from(cfg: &ExporterConfig) -> Self {
        Self {
            metrics_path: cfg.metrics_path.clone(),
            enable_html: cfg.enable_html,
            html_path: cfg.html_path.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub merger: Arc<Merger>,
    pub status: Arc<StatusBoard>,
    pub metrics: PrometheusHandle,
}

pub fn router(state: AppState, routes: &Routes) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ready", get(ready))
        .route("/status", get(status))
        .route(&routes.metrics_path, get(render_metrics));

    if routes.enable_html {
        app = app.route(&routes.html_path, get(dashboard));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn ready(State(state): State<AppState>) -> Response {
    if state.status.is_ready() {
        (StatusCode::OK, "Ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not ready").into_response()
    }
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

#[derive(Serialize)]
struct MergedSummary {
    total_charts: usize,
    total_versions: usize,
}

#[derive(Serialize)]
struct StatusResp {
    #[serde(flatten)]
    scheduler: StatusSnapshot,
    merged: Option<MergedSummary>,
}

async fn status(State(state): State<AppState>) -> Json<StatusResp> {
    let merged = state.merger.view().map(|v| MergedSummary {
        total_charts: v.total_charts,
        total_versions: v.total_versions,
    });
    Json(StatusResp {
        scheduler: state.status.snapshot(),
        merged,
    })
}

async fn dashboard(State(state): State<AppState>) -> Response {
    match state.merger.view() {
        Some(view) => Html(web::dashboard(&view, Utc::now()).into_string()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "No data available yet").into_response(),
    }
}
