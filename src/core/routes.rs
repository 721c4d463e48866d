// HTTP routes configuration

use crate::core::state::AppState;
use crate::handlers::{fallback, health, metrics, settings, torrent};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Commands
        .route("/torrent/add", post(torrent::torrent_add_handler))
        .route("/torrent/progress", post(torrent::torrent_progress_handler))
        .route("/torrent/simulate", post(torrent::torrent_simulate_handler))
        .route("/torrent/complete", post(torrent::torrent_complete_handler))
        .route("/torrent/clear", post(torrent::torrent_clear_handler))
        .route("/settings/dark_mode", post(settings::dark_mode_handler))

        // Queries
        .route("/torrent/status", get(torrent::torrent_status_handler))
        .route("/torrent/get", get(torrent::torrent_get_handler))
        .route("/torrent/list", get(torrent::torrent_list_handler))
        .route("/settings", get(settings::settings_handler))
        .route("/session", get(settings::session_handler))

        // Monitoring
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))

        .fallback(fallback::fallback_handler)

        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Config, LoggingConfig, ServerConfig, SessionConfig};
    use crate::persist::snapshot::{JsonFileStore, SessionStore};
    use crate::stores::registry::Registry;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn create_router(state_path: std::path::PathBuf) -> Router {
        let config = Config {
            server: ServerConfig {
                port: Some(7878),
                unix_socket: None,
                num_threads: 2,
            },
            session: SessionConfig {
                state_path: state_path.clone(),
                ..SessionConfig::default()
            },
            logging: LoggingConfig::default(),
        };
        let store = Arc::new(JsonFileStore::new(state_path));
        let registry = Registry::new(store, &config.session);
        build_router(Arc::new(AppState::new(config, Arc::new(registry))))
    }

    async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_full_lifecycle_over_http() {
        let temp_dir = TempDir::new().unwrap();
        let state_path = temp_dir.path().join("session.json");
        let router = create_router(state_path.clone());

        let (status, body) = call(&router, Method::POST, "/torrent/add?source=magnet%3A%3Fxt%3Dabc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);

        let (_, body) = call(&router, Method::POST, "/torrent/progress?id=1&bytes=10").await;
        assert_eq!(body["torrent"]["downloaded_bytes"], 10);

        for _ in 0..2 {
            let (_, body) = call(&router, Method::POST, "/torrent/progress?id=1&bytes=200").await;
            assert_eq!(body["torrent"]["downloaded_bytes"], 100);
        }

        let (_, body) = call(&router, Method::GET, "/torrent/status?id=1").await;
        assert_eq!(body["status"], "Complete");

        let (status, _) = call(&router, Method::POST, "/torrent/complete?id=1").await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&router, Method::GET, "/torrent/list").await;
        assert_eq!(body["torrents"], serde_json::json!([]));

        let saved = JsonFileStore::new(state_path).load().unwrap();
        assert!(saved.torrents.is_empty());
        assert_eq!(saved.next_id, 2);
    }

    #[tokio::test]
    async fn test_status_of_unknown_torrent() {
        let temp_dir = TempDir::new().unwrap();
        let router = create_router(temp_dir.path().join("session.json"));

        let (status, body) = call(&router, Method::GET, "/torrent/status?id=99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_dark_mode_route() {
        let temp_dir = TempDir::new().unwrap();
        let router = create_router(temp_dir.path().join("session.json"));

        let (_, body) = call(&router, Method::POST, "/settings/dark_mode?enabled=true").await;
        assert_eq!(body["dark_mode"], true);

        let (_, body) = call(&router, Method::GET, "/session").await;
        assert_eq!(body["dark_mode"], true);
        assert_eq!(body["next_id"], 1);
    }

    #[tokio::test]
    async fn test_missing_query_parameter_is_json_error() {
        let temp_dir = TempDir::new().unwrap();
        let router = create_router(temp_dir.path().join("session.json"));

        let (status, body) = call(&router, Method::GET, "/torrent/status").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("id"));

        let (status, body) = call(&router, Method::POST, "/torrent/progress?id=1&bytes=lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = call(&router, Method::POST, "/settings/dark_mode?enabled=maybe").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let temp_dir = TempDir::new().unwrap();
        let router = create_router(temp_dir.path().join("session.json"));

        let (status, body) = call(&router, Method::GET, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
