//! Email/password credential checks
//!
//! An unknown email and a wrong password produce the same
//! `InvalidCredentials` error, and both paths run one password comparison.
//! The unknown-email comparison runs against the last stored hash that
//! compared cleanly, so it costs the same as a real account's (bcrypt or
//! Argon2, at that hash's cost). Until one has been seen, a default Argon2id
//! hash stands in.

use super::error::{AuthError, AuthResult};
use super::password::{
    compare_password, hash_password_with_config, verify_password, PasswordConfig,
};
use marquee_core::{User, UserRepository};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;

/// Hash compared against before any stored hash has been seen
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password_with_config("marquee-dummy-password", &PasswordConfig::default())
            .unwrap_or_default()
    })
}

/// Verifies an email and plaintext password against the stored hash
#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserRepository>,
    decoy: Arc<RwLock<Option<String>>>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            users,
            decoy: Arc::new(RwLock::new(None)),
        }
    }

    /// Hash the unknown-email path compares against
    async fn decoy_hash(&self) -> String {
        match self.decoy.read().await.as_ref() {
            Some(hash) => hash.clone(),
            None => dummy_hash().to_string(),
        }
    }

    /// Return the matching user, or `InvalidCredentials`
    pub async fn verify(&self, email: &str, password: &str) -> AuthResult<User> {
        let Some(user) = self.users.find_by_email(email).await? else {
            // Keep timing comparable with the wrong-password path
            let password = password.to_string();
            let decoy = self.decoy_hash().await;
            let _ = tokio::task::spawn_blocking(move || verify_password(&password, &decoy)).await;
            return Err(AuthError::invalid_credentials());
        };

        let matches = compare_password(password.to_string(), user.password_hash.clone())
            .await
            .map_err(|e| {
                tracing::error!(user_id = user.id, error = %e, "Stored password hash is unusable");
                AuthError::invalid_credentials()
            })?;

        *self.decoy.write().await = Some(user.password_hash.clone());

        if !matches {
            return Err(AuthError::invalid_credentials());
        }

        Ok(user)
    }
}
