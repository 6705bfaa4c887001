//! JWT token issuance and verification
//!
//! Implements the dual-token scheme with HMAC-SHA256 signing:
//! - Access tokens: short-lived, signed with the access secret
//! - Refresh tokens: long-lived, signed with a distinct refresh secret
//!
//! Issued-at and expiry live inside the signed payload, so verification
//! needs no server-side state.

use super::error::{AuthError, AuthErrorKind, AuthResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use marquee_core::{AuthConfig, SessionId, UserId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Claims embedded in both access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    /// JWT ID - unique per token
    pub jti: String,
    /// Session the token pair was issued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<SessionId>,
}

/// Which secret a token is signed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),

    #[error("Token lifetime overflows the expiry timestamp")]
    LifetimeOverflow,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => AuthError::invalid_signature(),
            TokenError::ExpiredToken => AuthError::expired(),
            other => AuthError::internal(other.to_string()),
        }
    }
}

/// Freshly minted access and refresh tokens
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub access_expires_in: u64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: u64,
}

fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

fn configuration_error(err: marquee_core::ConfigError) -> AuthError {
    AuthError::new(AuthErrorKind::Configuration, "Token signing is not configured")
        .with_detail(err.to_string())
}

/// Mints signed access and refresh tokens
#[derive(Clone)]
pub struct TokenIssuer {
    access_key: EncodingKey,
    refresh_key: EncodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenIssuer {
    /// Build an issuer from validated secrets
    ///
    /// Fails with `Configuration` when a secret is missing, too short, or
    /// shared between the two token kinds.
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        config.validate().map_err(configuration_error)?;

        Ok(Self {
            access_key: EncodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        })
    }

    /// Issue a token pair for `user_id` that is not bound to a session
    pub fn issue(&self, user_id: UserId) -> Result<TokenPair, TokenError> {
        self.issue_at(user_id, None, unix_now()?)
    }

    /// Issue a token pair bound to the session created at login
    pub fn issue_for_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<TokenPair, TokenError> {
        self.issue_at(user_id, Some(session_id), unix_now()?)
    }

    /// Issue a token pair with an explicit issued-at timestamp
    pub fn issue_at(
        &self,
        user_id: UserId,
        session_id: Option<SessionId>,
        issued_at: u64,
    ) -> Result<TokenPair, TokenError> {
        let access_token = self.sign(
            TokenKind::Access,
            user_id,
            session_id,
            issued_at,
            self.access_ttl_secs,
        )?;
        let refresh_token = self.sign(
            TokenKind::Refresh,
            user_id,
            session_id,
            issued_at,
            self.refresh_ttl_secs,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_in: self.access_ttl_secs,
            refresh_expires_in: self.refresh_ttl_secs,
        })
    }

    fn sign(
        &self,
        kind: TokenKind,
        user_id: UserId,
        session_id: Option<SessionId>,
        issued_at: u64,
        ttl_secs: u64,
    ) -> Result<String, TokenError> {
        let exp = issued_at
            .checked_add(ttl_secs)
            .ok_or(TokenError::LifetimeOverflow)?;

        let claims = Claims {
            user_id,
            iat: issued_at,
            exp,
            jti: Uuid::new_v4().to_string(),
            sid: session_id,
        };

        let key = match kind {
            TokenKind::Access => &self.access_key,
            TokenKind::Refresh => &self.refresh_key,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, key)?)
    }
}

/// Decodes and validates bearer tokens
#[derive(Clone)]
pub struct TokenVerifier {
    access_key: DecodingKey,
    refresh_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Build a verifier from validated secrets
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        config.validate().map_err(configuration_error)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            access_key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_key: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
        })
    }

    /// Verify signature and expiry of `token` against the secret for `kind`
    ///
    /// A token is valid strictly before `exp`; at `exp` it is expired.
    /// Malformed tokens are reported as `InvalidSignature`: they cannot be
    /// authenticated either.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let key = match kind {
            TokenKind::Access => &self.access_key,
            TokenKind::Refresh => &self.refresh_key,
        };

        let token_data = decode::<Claims>(token, key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                _ => TokenError::InvalidSignature,
            }
        })?;

        if unix_now()? >= token_data.claims.exp {
            return Err(TokenError::ExpiredToken);
        }

        Ok(token_data.claims)
    }
}
