//! Logout: revoke the session a refresh token belongs to
//!
//! Tokens minted at login carry the id of the session they were issued for,
//! and exactly that session is revoked. Tokens without a session id fall
//! back to the user's most recent active session.

use super::error::{AuthError, AuthResult};
use super::jwt::{Claims, TokenKind, TokenVerifier};
use chrono::Utc;
use marquee_core::{Session, SessionState, SessionStore, StoreError};
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionRevoker {
    verifier: TokenVerifier,
    sessions: Arc<dyn SessionStore>,
}

impl SessionRevoker {
    pub fn new(verifier: TokenVerifier, sessions: Arc<dyn SessionStore>) -> Self {
        Self { verifier, sessions }
    }

    /// Revoke the session named by `refresh_token` and return it
    ///
    /// Revoking an already-revoked session bound to the token succeeds again,
    /// so a retried logout does not surface an error.
    pub async fn revoke(&self, refresh_token: &str) -> AuthResult<Session> {
        let claims = self
            .verifier
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| AuthError::invalid_refresh_token().with_detail(e.to_string()))?;

        if claims.user_id <= 0 {
            return Err(AuthError::invalid_refresh_token().with_detail("token carries no user id"));
        }

        let session = self.resolve(&claims).await?;

        self.sessions
            .revoke(session.id)
            .await
            .map_err(|e| match e {
                // Deleted between lookup and update
                StoreError::NotFound(_) => AuthError::session_not_found(),
                other => other.into(),
            })
    }

    async fn resolve(&self, claims: &Claims) -> AuthResult<Session> {
        let Some(session_id) = claims.sid else {
            return self
                .sessions
                .get(claims.user_id)
                .await?
                .ok_or_else(AuthError::session_not_found);
        };

        let session = self
            .sessions
            .find(session_id)
            .await?
            .ok_or_else(AuthError::session_not_found)?;

        if session.user_id != claims.user_id {
            return Err(AuthError::invalid_refresh_token()
                .with_detail(format!("session {session_id} belongs to another user")));
        }

        match session.state(Utc::now()) {
            SessionState::Active | SessionState::Revoked => Ok(session),
            SessionState::Expired => Err(AuthError::session_not_found()),
        }
    }
}
