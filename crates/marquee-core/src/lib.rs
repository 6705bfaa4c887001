//! Marquee Core - Domain models, configuration and storage
//!
//! This crate defines the pieces shared by the API server and the CLI:
//! - Configuration management
//! - User and session models
//! - Storage error types
//! - Connection pool lifecycle
//! - `UserRepository` and `SessionStore` with PostgreSQL and in-memory backends

pub mod config;
pub mod db;
pub mod sessions;
pub mod users;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use sessions::{InMemorySessionStore, PgSessionStore, SessionPolicy, SessionStore};
pub use users::{InMemoryUserRepository, PgUserRepository, UserRepository};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User identifier as stored by the user-management service
pub type UserId = i64;

/// Session identifier
pub type SessionId = i64;

// ============================================================================
// Error Types
// ============================================================================

/// Storage errors shared by all repositories
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Session lifetime overflows the expiry timestamp: {0}")]
    InvalidLifetime(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Users
// ============================================================================

/// User account, owned by the user-management service and read-only here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    /// Argon2 PHC string or legacy bcrypt hash; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_admin: bool,
}

// ============================================================================
// Sessions
// ============================================================================

/// Server-side record of a login
///
/// Sessions are never deleted; revoked and expired rows stay as an audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a session at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Revoked,
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Revoked => write!(f, "revoked"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl Session {
    /// State of the session at `now`
    ///
    /// Revocation wins over expiry: a session revoked before it lapsed
    /// reports `Revoked` forever.
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if self.revoked_at.is_some() {
            SessionState::Revoked
        } else if now >= self.expires_at {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }

    /// Whether the session is neither revoked nor expired at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == SessionState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration, revoked: bool) -> Session {
        let now = Utc::now();
        Session {
            id: 1,
            user_id: 7,
            created_at: now,
            updated_at: now,
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
        }
    }

    #[test]
    fn test_session_states() {
        let now = Utc::now();
        assert_eq!(session(Duration::hours(1), false).state(now), SessionState::Active);
        assert_eq!(session(Duration::hours(1), true).state(now), SessionState::Revoked);
        assert_eq!(session(Duration::hours(-1), false).state(now), SessionState::Expired);
        assert_eq!(session(Duration::hours(-1), true).state(now), SessionState::Revoked);
    }

    #[test]
    fn test_session_expires_at_boundary() {
        let s = session(Duration::hours(1), false);
        assert!(s.is_active(s.expires_at - Duration::seconds(1)));
        assert!(!s.is_active(s.expires_at));
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: 7,
            email: "a@a.com".to_string(),
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_admin: false,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("a@a.com"));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let json = serde_json::to_value(session(Duration::hours(1), false)).unwrap();
        assert_eq!(json["userId"], 7);
        assert!(json["revokedAt"].is_null());
        assert!(json["expiresAt"].is_string());
    }
}
