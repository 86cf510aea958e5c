// GET handlers: version, latest metrics

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use super::AppState;

/// Package name and version, baked in at build time.
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /version
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/metrics: most recent record, or 503 until the first tick has been published.
pub(super) async fn latest_metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let latest = state.latest_rx.borrow().clone();
    match latest {
        Some(record) => axum::Json(record).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(serde_json::json!({ "error": "no metrics sampled yet" })),
        )
            .into_response(),
    }
}
