//! Router wiring for integration tests
//!
//! Everything runs on in-memory stores with fixed signing secrets, so tests
//! can mint tokens with [`TestApp::issuer`] that the router accepts.

use crate::auth::TokenIssuer;
use crate::create_router;
use crate::state::AppState;
use axum::Router;
use marquee_core::{
    AppConfig, AuthConfig, InMemorySessionStore, InMemoryUserRepository, SessionPolicy,
};
use std::sync::Arc;

pub const TEST_ACCESS_SECRET: &str = "test-access-secret-0123456789abcdefghijkl";
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdefghijkl";

/// Configuration with valid test secrets and default lifetimes
pub fn test_config() -> AppConfig {
    AppConfig {
        auth: AuthConfig {
            access_secret: TEST_ACCESS_SECRET.to_string(),
            refresh_secret: TEST_REFRESH_SECRET.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A router plus handles on the stores behind it
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub users: Arc<InMemoryUserRepository>,
    pub sessions: Arc<InMemorySessionStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(SessionPolicy::default())
    }

    /// Build with a custom session lifetime, e.g. zero to get expired sessions
    pub fn with_policy(policy: SessionPolicy) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let sessions = Arc::new(InMemorySessionStore::new(policy));
        let state = Arc::new(
            AppState::in_memory(test_config(), users.clone(), sessions.clone())
                .expect("test secrets are valid"),
        );

        Self {
            router: create_router(state.clone()),
            state,
            users,
            sessions,
        }
    }

    /// Issuer signing with the same secrets as the router
    pub fn issuer(&self) -> TokenIssuer {
        TokenIssuer::new(&test_config().auth).expect("test secrets are valid")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Router over empty in-memory stores
pub fn create_router_for_testing() -> Router {
    TestApp::new().router
}
