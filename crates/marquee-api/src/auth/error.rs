//! Typed failures of the authentication components
//!
//! Every component returns an [`AuthError`] carrying an [`AuthErrorKind`];
//! the HTTP boundary maps kinds to status codes in one place
//! (see `crate::error::AppError`).

use marquee_core::{ConfigError, StoreError};
use thiserror::Error;

/// Category of an authentication failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Required request field missing or empty
    Validation,
    /// Unknown email or wrong password (deliberately indistinguishable)
    InvalidCredentials,
    /// No `Authorization` header on a protected request
    MissingAuthorizationHeader,
    /// `Authorization` header without a bearer token
    MissingToken,
    /// Token signature does not verify, or the token is malformed
    InvalidSignature,
    /// Token is past its embedded expiry
    Expired,
    /// Token verified but its user no longer exists
    UserNotFound,
    /// Refresh token presented at logout failed verification
    InvalidRefreshToken,
    /// No active session matches the refresh token
    SessionNotFound,
    /// Signing secrets missing or unusable
    Configuration,
    /// Storage or other unexpected failure
    Internal,
}

impl AuthErrorKind {
    /// Stable machine-readable code used in response bodies and metrics
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::MissingAuthorizationHeader => "MissingAuthorizationHeader",
            Self::MissingToken => "MissingToken",
            Self::InvalidSignature => "InvalidSignature",
            Self::Expired => "Expired",
            Self::UserNotFound => "UserNotFound",
            Self::InvalidRefreshToken => "InvalidRefreshToken",
            Self::SessionNotFound => "SessionNotFound",
            Self::Configuration => "ConfigurationError",
            Self::Internal => "InternalError",
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Authentication failure with a client-safe message
///
/// `detail` holds diagnostic text for logs only; it is never sent to clients.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Validation, message)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(AuthErrorKind::InvalidCredentials, "Invalid email or password")
    }

    pub fn missing_authorization_header() -> Self {
        Self::new(
            AuthErrorKind::MissingAuthorizationHeader,
            "Missing Authorization header",
        )
    }

    pub fn missing_token() -> Self {
        Self::new(AuthErrorKind::MissingToken, "Missing bearer token")
    }

    pub fn invalid_signature() -> Self {
        Self::new(AuthErrorKind::InvalidSignature, "Invalid token")
    }

    pub fn expired() -> Self {
        Self::new(AuthErrorKind::Expired, "Token has expired")
    }

    pub fn user_not_found() -> Self {
        Self::new(AuthErrorKind::UserNotFound, "Unauthorized")
    }

    pub fn invalid_refresh_token() -> Self {
        Self::new(
            AuthErrorKind::InvalidRefreshToken,
            "Invalid or expired refresh token",
        )
    }

    pub fn session_not_found() -> Self {
        Self::new(AuthErrorKind::SessionNotFound, "No active session found")
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Internal, "Internal server error").with_detail(detail)
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::internal(err.to_string())
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::new(AuthErrorKind::Configuration, "Server misconfigured")
            .with_detail(err.to_string())
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;
