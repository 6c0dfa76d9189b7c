use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use wirepost_common::WirepostError;

/// Advisory lock key for "one pipeline run at a time".
const RUN_LOCK_KEY: i64 = 0x7769_7265_706f_7374; // "wirepost"

/// The persisted set of already-processed article links.
///
/// The core reads a full snapshot once at run start and writes once at run
/// end, after a successful publish. It never owns the storage.
#[async_trait]
pub trait LinkLedger: Send + Sync {
    /// Full snapshot of previously processed links.
    async fn seen_links(&self) -> Result<HashSet<String>>;

    /// Mark links as processed. Idempotent: re-marking a link is a no-op.
    async fn mark_seen(&self, links: &[String]) -> Result<()>;
}

pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self::new(pool))
    }

    /// Create the ledger table if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_links (
                link TEXT PRIMARY KEY,
                processed_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create processed_links table")?;
        Ok(())
    }

    /// Try to take the cross-run advisory lock. The lock is session
    /// scoped, so it is taken on a dedicated connection that the returned
    /// guard keeps out of the pool until released. A held lock surfaces as
    /// [`WirepostError::RunLockConflict`]; the caller should exit with
    /// "nothing to do".
    pub async fn try_lock_run(&self) -> Result<RunLock, WirepostError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire a connection for the run lock")?;
        let acquired = sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_lock($1)")
            .bind(RUN_LOCK_KEY)
            .fetch_one(&mut *conn)
            .await
            .context("Failed to acquire run lock")?;
        if !acquired {
            return Err(WirepostError::RunLockConflict);
        }
        Ok(RunLock { conn })
    }
}

/// Holds the run's advisory lock on its own connection.
pub struct RunLock {
    conn: sqlx::pool::PoolConnection<sqlx::Postgres>,
}

impl RunLock {
    /// Release the lock on the same session that took it.
    pub async fn release(mut self) -> Result<()> {
        sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
            .bind(RUN_LOCK_KEY)
            .fetch_one(&mut *self.conn)
            .await
            .context("Failed to release run lock")?;
        Ok(())
    }
}

#[async_trait]
impl LinkLedger for PostgresLedger {
    async fn seen_links(&self) -> Result<HashSet<String>> {
        let links = sqlx::query_scalar::<_, String>("SELECT link FROM processed_links")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read processed links")?;
        Ok(links.into_iter().collect())
    }

    async fn mark_seen(&self, links: &[String]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO processed_links (link)
            SELECT unnest($1::text[])
            ON CONFLICT (link) DO NOTHING
            "#,
        )
        .bind(links)
        .execute(&self.pool)
        .await
        .context("Failed to mark links as processed")?;
        info!(links = links.len(), "Marked links as processed");
        Ok(())
    }
}
