use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::DatabaseConfig;
use super::store::StoreError;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS contacts (
        id         UUID PRIMARY KEY,
        name       TEXT NOT NULL,
        email      TEXT NOT NULL,
        phone      TEXT NOT NULL,
        favorite   BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id                 UUID PRIMARY KEY,
        email              TEXT NOT NULL UNIQUE,
        password_hash      TEXT NOT NULL,
        subscription       TEXT NOT NULL DEFAULT 'starter'
                           CHECK (subscription IN ('starter', 'pro', 'business')),
        token              TEXT,
        avatar_url         TEXT NOT NULL,
        verified           BOOLEAN NOT NULL DEFAULT FALSE,
        verification_token TEXT,
        created_at         TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (verified <> (verification_token IS NOT NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS users_verification_token_idx ON users (verification_token)",
];

/// Owns the process-wide connection pool. Opened once at startup and handed to the stores.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await?;

        info!("Database connection pool ready (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema is up to date");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}
