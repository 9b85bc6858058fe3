/// Content Repository
///
/// Postgres storage for cached articles
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error};

use super::ContentStore;
use crate::error::{AppError, Result};
use crate::models::ContentRecord;

#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    content_id: String,
    title: String,
    summary: String,
    image_url: Option<String>,
    related_links: Vec<String>,
    categories: Vec<String>,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    access_count: i64,
}

impl From<ContentRow> for ContentRecord {
    fn from(row: ContentRow) -> Self {
        ContentRecord {
            content_id: row.content_id,
            title: row.title,
            summary: row.summary,
            image_url: row.image_url,
            related_tags: row.related_links,
            categories: row.categories,
            created_at: row.created_at,
            last_accessed_at: row.last_accessed_at,
            access_count: row.access_count,
        }
    }
}

#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT content_id, title, summary, image_url, related_links, categories,
                   created_at, last_accessed_at, access_count
            FROM wiki_content
            WHERE content_id = $1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(content_id, "Failed to load content: {}", e);
            AppError::Database(e.to_string())
        })?;

        Ok(row.map(ContentRecord::from))
    }

    async fn record_hit(
        &self,
        content_id: &str,
        accessed_at: DateTime<Utc>,
    ) -> Result<Option<ContentRecord>> {
        // Single statement, so the increment cannot be lost between readers
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            UPDATE wiki_content
            SET access_count = access_count + 1,
                last_accessed_at = $2
            WHERE content_id = $1
            RETURNING content_id, title, summary, image_url, related_links, categories,
                      created_at, last_accessed_at, access_count
            "#,
        )
        .bind(content_id)
        .bind(accessed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(content_id, "Failed to record content hit: {}", e);
            AppError::Database(e.to_string())
        })?;

        Ok(row.map(ContentRecord::from))
    }

    async fn insert_if_absent(&self, record: &ContentRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO wiki_content (
                content_id, title, summary, image_url, related_links, categories,
                created_at, last_accessed_at, access_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (content_id) DO NOTHING
            "#,
        )
        .bind(&record.content_id)
        .bind(&record.title)
        .bind(&record.summary)
        .bind(&record.image_url)
        .bind(&record.related_tags)
        .bind(&record.categories)
        .bind(record.created_at)
        .bind(record.last_accessed_at)
        .bind(record.access_count)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(content_id = %record.content_id, "Failed to insert content: {}", e);
            AppError::Database(e.to_string())
        })?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!(
                content_id = %record.content_id,
                "Content already cached by a concurrent writer"
            );
        }

        Ok(inserted)
    }
}
