//! PostgreSQL connection pool lifecycle
//!
//! One pool is built at startup, shared by every repository, and closed on
//! shutdown.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::{DatabaseConfig, Result, StoreError};

/// Open the process-wide connection pool
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| StoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

    tracing::info!(pool_size = config.pool_size, "Database pool established");
    Ok(pool)
}

/// Create the `sessions` table and its lookup index if missing
///
/// The `users` table belongs to the user-management service and is not
/// touched here.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            revoked_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS sessions_user_created_idx ON sessions (user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Session schema ready");
    Ok(())
}

/// Check that the pool can still reach the server
pub async fn ping(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Close all pooled connections
pub async fn close(pool: &PgPool) {
    pool.close().await;
    tracing::info!("Database pool closed");
}
