//! Marquee CLI - operator commands for the session store
//!
//! Usage:
//!   marquee init-db
//!   marquee hash-password <password>
//!   marquee sessions <user-id>
//!   marquee revoke <session-id>

use anyhow::Context;
use clap::{Parser, Subcommand};
use marquee_core::{db, AppConfig, PgSessionStore, SessionPolicy, SessionStore};
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Marquee authentication operator CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sessions table and index if missing
    InitDb,
    /// Print an Argon2id hash for a password
    HashPassword {
        /// Plaintext password
        password: String,
    },
    /// List every session of a user, newest first
    Sessions {
        /// User id
        user_id: i64,
    },
    /// Revoke one session
    Revoke {
        /// Session id
        session_id: i64,
    },
}

async fn open_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    db::connect(&config.database)
        .await
        .context("Failed to connect to database")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::HashPassword { password } = &cli.command {
        let hash = marquee_api::auth::hash_password(password).context("Failed to hash password")?;
        println!("{hash}");
        return Ok(());
    }

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let pool = open_pool(&config).await?;
    let store = PgSessionStore::new(pool.clone(), SessionPolicy::from_auth(&config.auth));

    let result = match cli.command {
        Commands::InitDb => db::init_schema(&pool).await.map(|()| {
            println!("Session schema ready");
        }),
        Commands::Sessions { user_id } => store.list(user_id).await.map(|sessions| {
            let now = chrono::Utc::now();
            if sessions.is_empty() {
                println!("No sessions for user {user_id}");
            }
            for session in sessions {
                println!(
                    "{:>8}  {:<8}  created {}  expires {}",
                    session.id,
                    session.state(now).to_string(),
                    session.created_at.to_rfc3339(),
                    session.expires_at.to_rfc3339(),
                );
            }
        }),
        Commands::Revoke { session_id } => store.revoke(session_id).await.map(|session| {
            println!(
                "Revoked session {} of user {}",
                session.id, session.user_id
            );
        }),
        Commands::HashPassword { .. } => Ok(()),
    };

    db::close(&pool).await;
    result.context("Command failed")
}
