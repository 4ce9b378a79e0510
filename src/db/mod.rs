use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::attributes::repo::AttributeRepo;
use crate::auth::repo::UserRepo;
use crate::recipes::repo::RecipeRepo;

#[cfg(test)]
pub mod memory;

/// Failure surfaced by any repository implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Turns a unique-index violation into `Conflict(msg)`, anything else into `Database`.
    pub fn unique(e: sqlx::Error, msg: &str) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict(msg.to_string()),
            _ => Self::Database(e),
        }
    }
}

/// Everything the HTTP layer needs from persistence.
pub trait Store: UserRepo + RecipeRepo + AttributeRepo {}

impl<T> Store for T where T: UserRepo + RecipeRepo + AttributeRepo {}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}
