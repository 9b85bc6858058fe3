//! Storage for cached content and interest scores
//!
//! Both stores are traits so the engine runs the same way against Postgres
//! and against the in-memory maps used for local runs and tests.

pub mod content_repo;
pub mod interest_repo;
pub mod memory;

pub use content_repo::PgContentStore;
pub use interest_repo::PgInterestStore;
pub use memory::{MemoryContentStore, MemoryInterestStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{ContentRecord, InterestScore};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read a record without touching its access statistics
    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>>;

    /// Atomically bump `access_count` and `last_accessed_at`, returning the
    /// updated record, or `None` when the id is not cached
    async fn record_hit(
        &self,
        content_id: &str,
        accessed_at: DateTime<Utc>,
    ) -> Result<Option<ContentRecord>>;

    /// Insert unless a row with the same id exists. Returns whether this call
    /// created the row.
    async fn insert_if_absent(&self, record: &ContentRecord) -> Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InterestStore: Send + Sync {
    /// Add `weight` to every listed tag, creating missing rows. Tags are
    /// applied one by one, so a repeated tag is incremented once per
    /// occurrence. The whole call is one unit of work.
    async fn increment(
        &self,
        user_id: i64,
        tags: &[String],
        weight: f64,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Highest scores first, ties broken by tag
    async fn top(&self, user_id: i64, limit: usize) -> Result<Vec<InterestScore>>;
}

/// Create the Postgres pool used by both stores
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "Database pool created"
    );
    Ok(pool)
}

/// Apply embedded schema migrations
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed successfully");
    Ok(())
}
