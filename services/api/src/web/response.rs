//! services/api/src/web/response.rs
//!
//! The JSON envelope every endpoint answers with, and the mapping from the core
//! error taxonomy to HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use identity_core::IdentityError;
use serde::Serialize;
use tracing::error;

/// Standard response body: `{ statusCode, data, message, success }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.is_success(),
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// A failed request: a status code and a message that is safe to show.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
}

impl ApiFailure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
    }
}

impl From<IdentityError> for ApiFailure {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(message) => Self::new(StatusCode::BAD_REQUEST, message),
            IdentityError::Conflict(message) => Self::new(StatusCode::CONFLICT, message),
            IdentityError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            IdentityError::Unauthorized(message) => Self::new(StatusCode::UNAUTHORIZED, message),
            IdentityError::Internal(detail) => {
                error!("Internal error: {}", detail);
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ApiResponse::new(self.status, serde_json::Value::Null, self.message);
        (self.status, Json(body)).into_response()
    }
}
