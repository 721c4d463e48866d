// Metrics endpoint

use crate::core::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// Command counters plus registry gauges
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.metrics.get_snapshot(&state.registry);
    (StatusCode::OK, Json(snapshot)).into_response()
}
