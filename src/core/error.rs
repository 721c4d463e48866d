// Centralized error handling for the session service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by registry commands. None of them mutate state.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("Torrent not found: {0}")]
    NotFound(u64),

    #[error("Torrent ids exhausted")]
    IdsExhausted,
}

/// Errors raised while loading or saving the session snapshot
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("No saved session at {0}")]
    Missing(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode or decode session: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("source must not be empty")]
    EmptySource,

    #[error("source too long: {actual} bytes (max {max})")]
    TooLong { max: usize, actual: usize },

    #[error("source contains control characters")]
    ControlCharacter,

    #[error("invalid magnet link: {0}")]
    InvalidMagnet(String),
}

/// Errors surfaced by HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidInput(e) => ApiError::InvalidParameter(e.to_string()),
            RegistryError::NotFound(id) => ApiError::NotFound(format!("torrent {}", id)),
            RegistryError::IdsExhausted => ApiError::InternalError("torrent ids exhausted".to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use crate::models::api::ErrorResponse;

        let status = match &self {
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_maps_to_status() {
        let response = ApiError::from(RegistryError::NotFound(7)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            ApiError::from(RegistryError::InvalidInput(ValidationError::EmptySource)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(RegistryError::IdsExhausted).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(RegistryError::NotFound(99).to_string(), "Torrent not found: 99");
        assert_eq!(
            RegistryError::from(ValidationError::EmptySource).to_string(),
            "Invalid input: source must not be empty"
        );
    }
}
