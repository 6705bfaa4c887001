//! Durable session records and their revocation state
//!
//! A session is created at login and only ever mutated by revocation.
//! Lookups for logout consider a session current only while it is neither
//! revoked nor past `expires_at`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPool;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::config::{AuthConfig, DEFAULT_REFRESH_TTL_SECS, MAX_TTL_SECS};
use crate::{Result, Session, SessionId, StoreError, UserId};

const SESSION_COLUMNS: &str = "id, user_id, created_at, updated_at, expires_at, revoked_at";

/// How long a new session stays valid
///
/// Bound to the refresh token lifetime, since the refresh token is what
/// logout presents to revoke the session.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub lifetime: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            lifetime: Duration::seconds(DEFAULT_REFRESH_TTL_SECS as i64),
        }
    }
}

impl SessionPolicy {
    pub fn new(lifetime: Duration) -> Self {
        Self { lifetime }
    }

    /// Session lifetime equal to the configured refresh token lifetime,
    /// capped at `MAX_TTL_SECS`
    pub fn from_auth(config: &AuthConfig) -> Self {
        let secs = config.refresh_ttl_secs.min(MAX_TTL_SECS);
        Self::new(Duration::seconds(secs as i64))
    }

    fn expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_add_signed(self.lifetime).ok_or_else(|| {
            StoreError::InvalidLifetime(format!(
                "{}s from {}",
                self.lifetime.num_seconds(),
                now.to_rfc3339()
            ))
        })
    }
}

/// Storage of login sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new active session for `user_id`
    async fn create(&self, user_id: UserId) -> Result<Session>;

    /// Most recently created session of `user_id` that is neither revoked nor expired
    async fn get(&self, user_id: UserId) -> Result<Option<Session>>;

    /// Session by identifier, whatever its state
    async fn find(&self, session_id: SessionId) -> Result<Option<Session>>;

    /// Stamp `revoked_at` and `updated_at` with the current time
    ///
    /// Revoking an already revoked session rewrites the timestamps and
    /// succeeds. Fails with `StoreError::NotFound` for an unknown id.
    async fn revoke(&self, session_id: SessionId) -> Result<Session>;

    /// Every session of `user_id`, newest first
    async fn list(&self, user_id: UserId) -> Result<Vec<Session>>;
}

/// PostgreSQL-backed session store
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    policy: SessionPolicy,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, policy: SessionPolicy) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, user_id: UserId) -> Result<Session> {
        let now = Utc::now();
        let expires_at = self.policy.expires_at(now)?;

        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (user_id, created_at, updated_at, expires_at, revoked_at)
            VALUES ($1, $2, $2, $3, NULL)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(session_id = session.id, user_id, "Session created");
        Ok(session)
    }

    async fn get(&self, user_id: UserId) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find(&self, session_id: SessionId) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn revoke(&self, session_id: SessionId) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            UPDATE sessions
            SET revoked_at = $1, updated_at = $1
            WHERE id = $2
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(Utc::now())
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;

        tracing::debug!(session_id, user_id = session.user_id, "Session revoked");
        Ok(session)
    }

    async fn list(&self, user_id: UserId) -> Result<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

#[derive(Default)]
struct SessionTable {
    next_id: SessionId,
    rows: BTreeMap<SessionId, Session>,
}

/// In-memory session store for tests and local development
///
/// Ids are assigned in insertion order, so a higher id is always newer.
#[derive(Default)]
pub struct InMemorySessionStore {
    table: RwLock<SessionTable>,
    policy: SessionPolicy,
}

impl InMemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            table: RwLock::default(),
            policy,
        }
    }

    /// Number of stored sessions, in any state
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, user_id: UserId) -> Result<Session> {
        let now = Utc::now();
        let expires_at = self.policy.expires_at(now)?;
        let mut table = self.table.write().await;
        table.next_id += 1;

        let session = Session {
            id: table.next_id,
            user_id,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        };
        table.rows.insert(session.id, session.clone());

        Ok(session)
    }

    async fn get(&self, user_id: UserId) -> Result<Option<Session>> {
        let now = Utc::now();
        let table = self.table.read().await;

        Ok(table
            .rows
            .values()
            .rev()
            .find(|s| s.user_id == user_id && s.is_active(now))
            .cloned())
    }

    async fn find(&self, session_id: SessionId) -> Result<Option<Session>> {
        Ok(self.table.read().await.rows.get(&session_id).cloned())
    }

    async fn revoke(&self, session_id: SessionId) -> Result<Session> {
        let now = Utc::now();
        let mut table = self.table.write().await;
        let session = table
            .rows
            .get_mut(&session_id)
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;

        session.revoked_at = Some(now);
        session.updated_at = now;

        Ok(session.clone())
    }

    async fn list(&self, user_id: UserId) -> Result<Vec<Session>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}
