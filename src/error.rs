use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{models::ErrorResponse, storage::UploadError};

/// ApiError
///
/// The full taxonomy of expected request outcomes. Every variant except `Io`
/// is a normal, user-facing result classified by the core and surfaced to the
/// boundary layer unchanged; nothing here is retried or recovered from.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad credentials. Deliberately never distinguishes an unknown username
    /// from a wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No session cookie, or the token is expired or unknown.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authenticated, but the policy denies the action.
    #[error("access denied")]
    Forbidden,

    /// The requested post does not exist.
    #[error("post not found")]
    NotFound,

    /// A required field is missing or empty.
    #[error("{0}")]
    Validation(String),

    /// The upload gate refused the file (size or type).
    #[error("{0}")]
    UploadRejected(UploadError),

    /// I/O failure while persisting an upload. Fatal to the request only,
    /// distinct from the gate's rejections.
    #[error("failed to store the uploaded file")]
    Io(#[source] std::io::Error),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(inner) => ApiError::Io(inner),
            rejected => ApiError::UploadRejected(rejected),
        }
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::UploadRejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Io(source) = &self {
            tracing::error!(error = %source, "upload persistence failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
