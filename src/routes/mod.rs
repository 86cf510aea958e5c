// HTTP + WebSocket exposition of published metrics

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{broadcast, watch};
use tower_http::cors::{Any, CorsLayer};

use crate::models::DerivedMetrics;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) latest_rx: watch::Receiver<Option<DerivedMetrics>>,
    pub(crate) metrics_tx: broadcast::Sender<DerivedMetrics>,
    pub(crate) ws_connections: Arc<AtomicUsize>,
}

pub fn app(
    latest_rx: watch::Receiver<Option<DerivedMetrics>>,
    metrics_tx: broadcast::Sender<DerivedMetrics>,
    ws_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        latest_rx,
        metrics_tx,
        ws_connections,
    };
    Router::new()
        .route("/", get(|| async { "procmon: host metrics sampler" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/metrics", get(http::latest_metrics_handler)) // GET /api/metrics
        .route("/ws/metrics", get(ws::ws_metrics)) // WS /ws/metrics
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
