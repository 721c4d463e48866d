use crate::core::state::AppState;
use crate::models::api::{DarkModeQuery, SettingsResponse};
use crate::validation::query::ApiQuery;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// GET /settings
pub async fn settings_handler(State(state): State<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        Json(SettingsResponse {
            success: true,
            dark_mode: state.registry.dark_mode(),
        }),
    )
        .into_response()
}

/// Change the display preference. Persisted with the session.
///
/// POST /settings/dark_mode?enabled=<true|false>
pub async fn dark_mode_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<DarkModeQuery>,
) -> Response {
    state.metrics.increment_commands();
    let dark_mode = state.registry.set_dark_mode(params.enabled);

    (
        StatusCode::OK,
        Json(SettingsResponse {
            success: true,
            dark_mode,
        }),
    )
        .into_response()
}

/// Full session snapshot, in the persisted layout
///
/// GET /session
pub async fn session_handler(State(state): State<Arc<AppState>>) -> Response {
    (StatusCode::OK, Json(state.registry.snapshot())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Config, LoggingConfig, ServerConfig, SessionConfig};
    use crate::models::session::SessionState;
    use crate::persist::snapshot::MemoryStore;
    use crate::stores::registry::Registry;
    use axum::body::Body;
    use http_body_util::BodyExt;

    fn create_test_state(store: Arc<MemoryStore>) -> Arc<AppState> {
        let config = Config {
            server: ServerConfig {
                port: Some(7878),
                unix_socket: None,
                num_threads: 2,
            },
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        };
        let registry = Registry::new(store, &config.session);
        Arc::new(AppState::new(config, Arc::new(registry)))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        let (_, body) = response.into_parts();
        Body::new(body).collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_dark_mode_toggle_is_saved() {
        let store = Arc::new(MemoryStore::new());
        let state = create_test_state(store.clone());

        let response = settings_handler(State(state.clone())).await;
        let body: SettingsResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(!body.dark_mode);

        let response = dark_mode_handler(State(state.clone()), ApiQuery(DarkModeQuery { enabled: true })).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: SettingsResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(body.dark_mode);

        assert!(store.saved().unwrap().dark_mode);
    }

    #[tokio::test]
    async fn test_session_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let state = create_test_state(store);
        state.registry.add_torrent("magnet:?xt=abc").unwrap();

        let response = session_handler(State(state.clone())).await;
        let snapshot: SessionState = serde_json::from_slice(&body_bytes(response).await).unwrap();

        assert_eq!(snapshot, state.registry.snapshot());
        assert_eq!(snapshot.next_id, 2);
    }
}
