//! Errors returned by HTTP handlers and their JSON rendering.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use depot_storage::StorageError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Realm sent with authentication challenges.
pub const REALM: &str = "depot";

/// Errors returned by handlers. Every variant renders as `{code, detail}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure reported by the store.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Malformed parameters or body.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or wrong credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Anything the client cannot fix.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }

    /// Map to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(err) => match err {
                StorageError::NotFound { .. } | StorageError::EmptySearch => StatusCode::NOT_FOUND,
                StorageError::InvalidSearchKey(_)
                | StorageError::InvalidSearch(_)
                | StorageError::InvalidPathValue { .. }
                | StorageError::InvalidDefinition(_)
                | StorageError::InvalidPatch(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = Json(json!({"code": status.as_u16(), "detail": self.to_string()}));
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(challenge) = HeaderValue::from_str(&format!("Basic realm=\"{REALM}\"")) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
            }
        }
        response
    }
}
