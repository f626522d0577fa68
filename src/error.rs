//! Error types for providers, construction and the HTTP host.
//!
//! - `ProviderError`: anything a data provider can fail with. The router never
//!   lets one escape; it maps failures onto a `RenderedView` state instead.
//! - `ConfigError`: fatal construction failures (bad options, unusable token).
//! - `AppError`: host-level failures, converted to JSON HTTP responses.
//!
//! Error mappings for `AppError`:
//! - `NotFound` → 404
//! - `Provider`, `Internal` → 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream API error: {status} for {url}")]
    Api { status: u16, url: String },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode content: {0}")]
    Decode(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No git repository for {0}")]
    NoRepository(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    #[error("Token is not a valid header value")]
    InvalidToken,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Invalid content directory {path}: {source}")]
    ContentDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {}", what)),
            AppError::Provider(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
