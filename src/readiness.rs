//! Blocks startup until PostgreSQL accepts queries.

use std::time::Duration;

use axum::async_trait;
use sqlx::{Connection, PgConnection};
use thiserror::Error;
use tracing::{error, info, warn};

pub const CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Waiting,
    Ready,
}

/// Why a single check failed. `Unavailable` and `Operational` are retried, `Fatal` is not.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Server not reachable yet (connection refused, DNS, pool).
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// Server reachable but not serving queries yet (starting up, recovering).
    #[error("database not operational: {0}")]
    Operational(String),

    /// Waiting will not help (bad URL, TLS setup, protocol mismatch).
    #[error("database check failed: {0}")]
    Fatal(String),
}

impl From<sqlx::Error> for CheckError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => CheckError::Operational(db.to_string()),
            e @ (sqlx::Error::Configuration(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_)) => {
                CheckError::Fatal(e.to_string())
            }
            other => CheckError::Unavailable(other.to_string()),
        }
    }
}

#[async_trait]
pub trait DatabaseCheck: Send + Sync {
    async fn check(&self) -> Result<(), CheckError>;
}

/// Opens a fresh connection and runs `SELECT 1`.
pub struct PgCheck {
    url: String,
}

impl PgCheck {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl DatabaseCheck for PgCheck {
    async fn check(&self) -> Result<(), CheckError> {
        let mut conn = PgConnection::connect(&self.url).await?;
        sqlx::query("SELECT 1").execute(&mut conn).await?;
        let _ = conn.close().await;
        Ok(())
    }
}

/// Polls `check` every `interval` until it succeeds; returns the number of checks made.
/// A `Fatal` failure ends the wait with that error.
pub async fn wait_for_db<C>(check: &C, interval: Duration) -> Result<u32, CheckError>
where
    C: DatabaseCheck + ?Sized,
{
    info!("waiting for database");
    let mut state = ReadinessState::Waiting;
    let mut attempts = 0;
    while state == ReadinessState::Waiting {
        attempts += 1;
        match check.check().await {
            Ok(()) => state = ReadinessState::Ready,
            Err(e @ CheckError::Fatal(_)) => {
                error!(attempt = attempts, error = %e, "database check cannot succeed");
                return Err(e);
            }
            Err(e) => {
                warn!(attempt = attempts, error = %e, retry_in = ?interval, "database unavailable");
                tokio::time::sleep(interval).await;
            }
        }
    }
    info!(attempts, "database available");
    Ok(attempts)
}
