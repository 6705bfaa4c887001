/// Authentication middleware for protecting routes
///
/// Extracts and validates the bearer access token from the Authorization
/// header, resolves the user it names, and adds the resulting [`Principal`]
/// to request extensions.
use super::error::{AuthError, AuthResult};
use super::jwt::{TokenKind, TokenVerifier};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::metrics;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use marquee_core::{SessionId, UserId, UserRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Authenticated identity attached to a request
///
/// Downstream handlers extract it with `Extension<Principal>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    pub is_admin: bool,
    /// Session the access token was issued for, when bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Pull the bearer token out of the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(AuthError::missing_authorization_header)?;

    // Non-ASCII header bytes cannot carry a JWT
    let value = value.to_str().map_err(|_| AuthError::missing_token())?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(AuthError::missing_token)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::missing_token());
    }

    Ok(token)
}

/// Verify an access token and resolve the user it was issued to
pub async fn authenticate(
    verifier: &TokenVerifier,
    users: &dyn UserRepository,
    token: &str,
) -> AuthResult<Principal> {
    let claims = verifier.verify(token, TokenKind::Access)?;

    let user = users
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(AuthError::user_not_found)?;

    Ok(Principal {
        user_id: user.id,
        email: user.email,
        username: user.username,
        is_admin: user.is_admin,
        session_id: claims.sid,
    })
}

/// Authentication middleware that requires a valid access token
///
/// This middleware:
/// 1. Extracts the Authorization header
/// 2. Validates the `Bearer <token>` format
/// 3. Verifies the token signature and expiry
/// 4. Resolves the user named by the token
/// 5. Adds [`Principal`] to request extensions
///
/// Every failure short-circuits with 401.
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use marquee_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let result = match bearer_token(request.headers()) {
        Ok(token) => authenticate(state.auth.verifier(), state.users.as_ref(), token).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            Ok(next.run(request).await)
        }
        Err(e) => {
            metrics::record_token_rejection(e.kind);
            audit_log(&AuditEvent::TokenRejected {
                reason: e.kind.code().to_string(),
                path: request.uri().path().to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            Err(e.into())
        }
    }
}
