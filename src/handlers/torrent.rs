use crate::core::error::{ApiError, RegistryError};
use crate::core::state::AppState;
use crate::validation::query::ApiQuery;
use crate::models::api::{
    AddResponse, ClearResponse, ListResponse, ProgressQuery, SimulateQuery, StatusResponse,
    SuccessResponse, TorrentAddQuery, TorrentIdQuery, TorrentResponse, TorrentView,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::warn;

/// Count a command and translate its failure for the client
fn track<T>(state: &AppState, command: &'static str, result: Result<T, RegistryError>) -> Result<T, ApiError> {
    state.metrics.increment_commands();
    result.map_err(|e| {
        state.metrics.increment_failed();
        warn!(command, error = %e, "Command rejected");
        ApiError::from(e)
    })
}

/// Start tracking a torrent
///
/// POST /torrent/add?source=<magnet or path>
pub async fn torrent_add_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<TorrentAddQuery>,
) -> Result<Response, ApiError> {
    let id = track(&state, "add", state.registry.add_torrent(&params.source))?;
    state.metrics.increment_added();

    Ok((
        StatusCode::OK,
        Json(AddResponse { success: true, id }),
    )
        .into_response())
}

/// Record an absolute byte count
///
/// POST /torrent/progress?id=<id>&bytes=<bytes>
pub async fn torrent_progress_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ProgressQuery>,
) -> Result<Response, ApiError> {
    let torrent = track(
        &state,
        "progress",
        state.registry.record_progress(params.id, params.bytes),
    )?;
    state.metrics.increment_progress();

    Ok((
        StatusCode::OK,
        Json(TorrentResponse {
            success: true,
            torrent: TorrentView::from(torrent),
        }),
    )
        .into_response())
}

/// Advance a torrent by one simulated tick
///
/// POST /torrent/simulate?id=<id>[&step=<bytes>]
pub async fn torrent_simulate_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<SimulateQuery>,
) -> Result<Response, ApiError> {
    let step = params.step.unwrap_or(state.config.session.simulate_step);
    let torrent = track(&state, "simulate", state.registry.advance(params.id, step))?;
    state.metrics.increment_progress();

    Ok((
        StatusCode::OK,
        Json(TorrentResponse {
            success: true,
            torrent: TorrentView::from(torrent),
        }),
    )
        .into_response())
}

/// Acknowledge and remove a torrent
///
/// POST /torrent/complete?id=<id>
pub async fn torrent_complete_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<TorrentIdQuery>,
) -> Result<Response, ApiError> {
    track(&state, "complete", state.registry.complete(params.id))?;
    state.metrics.add_removed(1);

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: format!("Torrent {} removed", params.id),
        }),
    )
        .into_response())
}

/// Remove every finished torrent
///
/// POST /torrent/clear
pub async fn torrent_clear_handler(State(state): State<Arc<AppState>>) -> Response {
    state.metrics.increment_commands();
    let removed = state.registry.clear_completed();
    state.metrics.add_removed(removed.len() as u64);

    (
        StatusCode::OK,
        Json(ClearResponse {
            success: true,
            removed,
        }),
    )
        .into_response()
}

/// GET /torrent/status?id=<id>
pub async fn torrent_status_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<TorrentIdQuery>,
) -> Result<Response, ApiError> {
    let status = state.registry.get_status(params.id).map_err(ApiError::from)?;

    Ok((
        StatusCode::OK,
        Json(StatusResponse {
            success: true,
            id: params.id,
            status: status.to_string(),
        }),
    )
        .into_response())
}

/// GET /torrent/get?id=<id>
pub async fn torrent_get_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<TorrentIdQuery>,
) -> Result<Response, ApiError> {
    let torrent = state.registry.get(params.id).map_err(ApiError::from)?;

    Ok((
        StatusCode::OK,
        Json(TorrentResponse {
            success: true,
            torrent: TorrentView::from(torrent),
        }),
    )
        .into_response())
}

/// GET /torrent/list
pub async fn torrent_list_handler(State(state): State<Arc<AppState>>) -> Response {
    let torrents = state
        .registry
        .list()
        .into_iter()
        .map(TorrentView::from)
        .collect();

    (
        StatusCode::OK,
        Json(ListResponse {
            success: true,
            torrents,
        }),
    )
        .into_response()
}
