//! Authentication API handlers
//!
//! Provides HTTP endpoints for login, logout, and the current principal.
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, Principal};
use crate::error::AppError;
use crate::metrics;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Login with email and password
///
/// Authenticates a user, opens a session, and returns an access and refresh
/// token bound to that session.
///
/// # Request Body
///
/// * `email` - User's email address
/// * `password` - User's password
///
/// # Responses
///
/// * `200 OK` - Authentication successful, returns tokens and the session
/// * `400 Bad Request` - Missing email or password
/// * `401 Unauthorized` - Invalid credentials
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            metrics::record_login(Err(crate::auth::AuthErrorKind::Validation));
            return Err(rejection.into());
        }
    };
    let email = request.email.clone().unwrap_or_default();

    match state.auth.login(request).await {
        Ok(outcome) => {
            metrics::record_login(Ok(()));
            audit_log(&AuditEvent::LoginSuccess {
                user_id: outcome.user.id,
                session_id: outcome.response.session.id,
                ip_address,
                user_agent,
            });
            Ok(Json(outcome.response))
        }
        Err(e) => {
            metrics::record_login(Err(e.kind));
            audit_log(&AuditEvent::LoginFailure {
                email,
                reason: e.kind.code().to_string(),
                ip_address,
                user_agent,
            });
            Err(e.into())
        }
    }
}

/// Logout the session behind a refresh token
///
/// Revokes the session the refresh token was issued for. Repeating the call
/// with the same token succeeds and leaves the session revoked.
///
/// # Request Body
///
/// * `refreshToken` - Refresh token from login
///
/// # Responses
///
/// * `200 OK` - Session revoked
/// * `400 Bad Request` - Missing or invalid refresh token, or no session
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logout successful", body = LogoutResponse),
        (status = 400, description = "Invalid refresh token or no session", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);

    let result = match payload {
        Ok(Json(request)) => state.auth.logout(request).await,
        Err(rejection) => Err(crate::auth::AuthError::validation(rejection.body_text())),
    };

    match result {
        Ok(session) => {
            metrics::record_logout(Ok(()));
            audit_log(&AuditEvent::Logout {
                user_id: session.user_id,
                session_id: session.id,
                ip_address,
            });
            Ok(Json(LogoutResponse {
                message: "Logged out successfully".to_string(),
                session,
            }))
        }
        Err(e) => {
            metrics::record_logout(Err(e.kind));
            audit_log(&AuditEvent::LogoutFailure {
                reason: e.kind.code().to_string(),
                ip_address,
            });
            Err(e.into())
        }
    }
}

/// Get the authenticated principal
///
/// Requires a valid access token.
///
/// # Responses
///
/// * `200 OK` - The principal attached by the auth middleware
/// * `401 Unauthorized` - Invalid or missing authentication
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current principal", body = Principal),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(principal)
}
