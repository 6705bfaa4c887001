//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthResult, AuthService, TokenIssuer, TokenVerifier};
use marquee_core::config::AppConfig;
use marquee_core::{
    InMemorySessionStore, InMemoryUserRepository, PgSessionStore, PgUserRepository,
    SessionPolicy, SessionStore, UserRepository,
};
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Ready status, cleared once shutdown begins
    pub is_ready: AtomicBool,
    /// Connection pool, absent when running on in-memory stores
    pub db_pool: Option<PgPool>,
    /// User lookup for credential checks and the auth middleware
    pub users: Arc<dyn UserRepository>,
    /// Login, logout, and token verification
    pub auth: AuthService,
}

impl AppState {
    /// Build state around an explicit set of repositories
    ///
    /// Fails with `Configuration` when the signing secrets are unusable.
    pub fn new(
        config: AppConfig,
        db_pool: Option<PgPool>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
    ) -> AuthResult<Self> {
        let issuer = TokenIssuer::new(&config.auth)?;
        let verifier = TokenVerifier::new(&config.auth)?;
        let auth = AuthService::new(users.clone(), sessions, issuer, verifier);

        Ok(Self {
            config,
            start_time: Instant::now(),
            is_ready: AtomicBool::new(true),
            db_pool,
            users,
            auth,
        })
    }

    /// State backed by PostgreSQL through a shared pool
    pub fn with_pool(config: AppConfig, pool: PgPool) -> AuthResult<Self> {
        let policy = SessionPolicy::from_auth(&config.auth);
        let users = Arc::new(PgUserRepository::new(pool.clone()));
        let sessions = Arc::new(PgSessionStore::new(pool.clone(), policy));
        Self::new(config, Some(pool), users, sessions)
    }

    /// State backed by the given in-memory stores
    pub fn in_memory(
        config: AppConfig,
        users: Arc<InMemoryUserRepository>,
        sessions: Arc<InMemorySessionStore>,
    ) -> AuthResult<Self> {
        Self::new(config, None, users, sessions)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
