//! API error handling
//!
//! The single place where failures become HTTP status codes.
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthError, AuthErrorKind};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code
    pub error: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Application error type
///
/// Every failure a handler can produce is already an `AuthError` with a kind,
/// so the response mapping below stays exhaustive over `AuthErrorKind`.
#[derive(Debug)]
pub struct AppError(pub AuthError);

/// HTTP status for each failure category
pub fn status_for(kind: AuthErrorKind) -> StatusCode {
    match kind {
        AuthErrorKind::Validation
        | AuthErrorKind::InvalidRefreshToken
        | AuthErrorKind::SessionNotFound => StatusCode::BAD_REQUEST,
        AuthErrorKind::InvalidCredentials
        | AuthErrorKind::MissingAuthorizationHeader
        | AuthErrorKind::MissingToken
        | AuthErrorKind::InvalidSignature
        | AuthErrorKind::Expired
        | AuthErrorKind::UserNotFound => StatusCode::UNAUTHORIZED,
        AuthErrorKind::Configuration | AuthErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError(err) = self;

        let status = status_for(err.kind);
        if status.is_server_error() {
            tracing::error!(
                code = err.kind.code(),
                detail = err.detail.as_deref().unwrap_or_default(),
                "Request failed"
            );
        } else {
            tracing::debug!(code = err.kind.code(), "Request rejected");
        }

        let body = ApiError::new(err.kind.code(), err.message);
        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError(AuthError::validation(rejection.body_text()))
    }
}
