use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::types::ErrorBody;

/// Failures while loading or running the model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid feature layout: {0}")]
    Layout(String),
    #[error("invalid estimator: {0}")]
    Estimator(String),
    #[error("feature length mismatch: got {got}, expected {expected}")]
    Width { got: usize, expected: usize },
    #[error("unknown category {value:?} for column {column}")]
    UnknownCategory { column: String, value: String },
    #[error("model backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    Value { key: &'static str, value: String },
}

/// Handler-level errors, rendered as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] JsonRejection),
    #[error(transparent)]
    Inference(#[from] ModelError),
    #[error("inference task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            // 422 for shape/type errors, 400 for bad JSON, 415 for content type
            ApiError::Request(rejection) => rejection.status(),
            ApiError::Inference(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ApiError::Request(rejection) => rejection.body_text(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(%status, "{detail}");
        } else {
            tracing::debug!(%status, "rejected request: {detail}");
        }
        (status, Json(ErrorBody { detail })).into_response()
    }
}
