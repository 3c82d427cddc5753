//! HTTP-facing errors.
//!
//! [`ApiError`] wraps [`hasher::Error`] together with the routing failures the
//! front end detects itself, and renders each as a status code plus a single
//! line of text.
//!
//! ## Status mapping
//! - `Rejected` -> `503 Service Unavailable`
//! - `InvalidInput`, `NotFound`, `InvalidKey` -> `400 Bad Request`
//! - `Internal` -> `500 Internal Server Error`
//! - `UnknownPath` -> `404 Not Found`
//! - `MethodNotAllowed` -> `405 Method Not Allowed`

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] hasher::Error),

    /// The path segment after `/hash/` is not a decimal handle.
    #[error("Invalid key encountered")]
    InvalidKey,

    #[error("Unknown URL path `{path}` encountered in {method} request")]
    UnknownPath { method: Method, path: String },

    #[error("Unsupported Method Type: {method}")]
    MethodNotAllowed { method: Method },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Pipeline(e) => match e {
                hasher::Error::Rejected => StatusCode::SERVICE_UNAVAILABLE,
                // Unknown and not-yet-ready handles are both client errors.
                hasher::Error::InvalidInput { .. } | hasher::Error::NotFound { .. } => {
                    StatusCode::BAD_REQUEST
                }
                hasher::Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidKey => StatusCode::BAD_REQUEST,
            Self::UnknownPath { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, "{self}");
        } else {
            tracing::debug!(%status, "{self}");
        }
        (status, format!("{self}\n")).into_response()
    }
}
