//! Postgres-backed stores.
//!
//! One `PostgresStore` implements every persistence port over a shared pool.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (connection class) | `08000 08001 08003 08004 08006 08007 08P01` | `Connection` |
//! | Io / PoolTimedOut / Protocol / Tls | N/A | `Connection` |
//! | anything else | any | `Database` |

mod ledger;
mod migrations;
mod orders;
mod users;
mod withdrawals;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use super::StoreError;

/// SQLSTATE codes for connection failures worth retrying.
const RETRYABLE_SQLSTATES: [&str; 7] = ["08000", "08003", "08006", "08001", "08004", "08007", "08P01"];

/// Advisory lock key held while the schema is applied.
const MIGRATION_LOCK: i64 = 0x6c6f_7961_6c74_79;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_uri: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_uri)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the idempotent schema statements in order, in one transaction.
    ///
    /// An advisory lock serialises concurrent starters against the same database.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MIGRATION_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;

        for statement in migrations::SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("migrate", e))?;
        info!(statements = migrations::SCHEMA.len(), "database schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => StoreError::Duplicate,
                Some(code) if RETRYABLE_SQLSTATES.contains(&code.as_ref()) => StoreError::Connection(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::Io(e) => StoreError::Connection(format!("i/o error in {}: {}", operation, e)),
        sqlx::Error::PoolTimedOut => StoreError::Connection(format!("pool timed out in {}", operation)),
        sqlx::Error::Protocol(msg) => StoreError::Connection(format!("protocol error in {}: {}", operation, msg)),
        sqlx::Error::Tls(e) => StoreError::Connection(format!("tls error in {}: {}", operation, e)),
        sqlx::Error::PoolClosed => StoreError::Database(format!("connection pool closed in {}", operation)),
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Store against `TEST_DATABASE_URI`, or `None` to skip database tests.
#[cfg(test)]
pub(crate) async fn test_store() -> Option<PostgresStore> {
    let uri = std::env::var("TEST_DATABASE_URI").ok().filter(|u| !u.trim().is_empty())?;
    Some(
        PostgresStore::connect(&uri)
            .await
            .expect("failed to connect to TEST_DATABASE_URI"),
    )
}

fn row_error(operation: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Database(format!("failed to decode row in {}: {}", operation, err))
}
