//! Error type shared by the upstream clients and the HTTP handlers.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(reqwest::StatusCode),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Video lookup is disabled")]
    VideoDisabled,
}

impl From<JsonRejection> for ProxyError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            Self::VideoDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::UpstreamStatus(_) => "upstream_error",
            Self::VideoDisabled => "video_disabled",
            Self::Upstream(_) => "internal",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Transport failures never leak details to the browser.
        let message = match &self {
            Self::Upstream(e) => {
                error!("Upstream request failed: {e}");
                "Internal Server Error".to_string()
            }
            other => {
                warn!("Request failed ({status}): {other}");
                other.to_string()
            }
        };

        let body = ErrorResponse {
            error: message,
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
