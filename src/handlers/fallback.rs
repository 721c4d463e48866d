use crate::core::error::ApiError;
use axum::{
    http::Uri,
    response::{IntoResponse, Response},
};

pub async fn fallback_handler(uri: Uri) -> Response {
    ApiError::NotFound(format!("no endpoint at {}", uri.path())).into_response()
}
