//! HTTP error responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;
use vetclaims_profile::ProfileError;

/// Error body returned by every route: `{"detail": "..."}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorBody {
    pub detail: String,
}

/// An error that maps onto an HTTP status and a `detail` message.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unprocessable(String),
    BadGateway(String),
    /// Logged in full; the client only sees a generic message.
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Validation { .. } => ApiError::BadRequest(err.to_string()),
            ProfileError::Conflict(_) => {
                ApiError::BadRequest("Profile with this email already exists".to_string())
            }
            ProfileError::NotFound => ApiError::NotFound("Veteran profile not found".to_string()),
            ProfileError::Storage(_) | ProfileError::Crypto(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::Internal(message) => {
                error!("Request failed: {}", message);
                "Internal server error".to_string()
            }
            ApiError::BadRequest(detail)
            | ApiError::NotFound(detail)
            | ApiError::Unprocessable(detail)
            | ApiError::BadGateway(detail) => detail,
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}
