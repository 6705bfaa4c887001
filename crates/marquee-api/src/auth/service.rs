//! Authentication service layer
//!
//! Login checks credentials, opens a session, and mints a token pair bound
//! to it. Logout revokes the session behind a refresh token.

use super::credentials::CredentialVerifier;
use super::error::{AuthError, AuthResult};
use super::jwt::{TokenIssuer, TokenVerifier};
use super::revoker::SessionRevoker;
use marquee_core::{Session, SessionStore, User, UserRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// User login request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    #[schema(value_type = Object)]
    pub session: Session,
}

/// Logout request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Logout response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub session: Session,
}

/// What a successful login produced, for the handler's audit trail
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub response: LoginResponse,
}

/// Passwords are taken verbatim, so only emptiness is checked here;
/// callers trim identifiers before passing them in.
fn required(value: Option<String>, field: &str) -> AuthResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::validation(format!("{field} is required"))),
    }
}

/// Authentication service
///
/// Built once at startup and shared through the application state.
#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialVerifier,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    revoker: SessionRevoker,
    sessions: Arc<dyn SessionStore>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            credentials: CredentialVerifier::new(users),
            revoker: SessionRevoker::new(verifier.clone(), sessions.clone()),
            issuer,
            verifier,
            sessions,
        }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Login with email and password
    ///
    /// # Returns
    ///
    /// * `Ok(LoginOutcome)` - Token pair and the session it is bound to
    /// * `Err(AuthError)` - `Validation` for missing fields, `InvalidCredentials`
    ///   for an unknown email or a wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginOutcome> {
        let email = required(request.email.map(|e| e.trim().to_string()), "email")?;
        let password = required(request.password, "password")?;

        let user = self.credentials.verify(&email, &password).await?;

        let session = self.sessions.create(user.id).await?;

        let tokens = match self.issuer.issue_for_session(user.id, session.id) {
            Ok(tokens) => tokens,
            Err(e) => {
                // Do not leave a usable session behind without tokens
                if let Err(revoke_err) = self.sessions.revoke(session.id).await {
                    tracing::warn!(
                        session_id = session.id,
                        error = %revoke_err,
                        "Failed to revoke session after token issuance error"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::debug!(user_id = user.id, session_id = session.id, "Session opened");

        Ok(LoginOutcome {
            user,
            response: LoginResponse {
                message: "Logged in successfully".to_string(),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                token_type: "Bearer".to_string(),
                expires_in: tokens.access_expires_in,
                session,
            },
        })
    }

    /// Revoke the session behind `request.refresh_token`
    pub async fn logout(&self, request: LogoutRequest) -> AuthResult<Session> {
        let refresh_token = required(
            request.refresh_token.map(|t| t.trim().to_string()),
            "refreshToken",
        )?;
        let session = self.revoker.revoke(&refresh_token).await?;

        tracing::debug!(
            user_id = session.user_id,
            session_id = session.id,
            "Session revoked"
        );

        Ok(session)
    }
}
