/// Interest Repository
///
/// Postgres storage for per-user tag scores
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;

use super::InterestStore;
use crate::error::{AppError, Result};
use crate::models::InterestScore;

#[derive(Clone)]
pub struct PgInterestStore {
    pool: PgPool,
}

impl PgInterestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterestStore for PgInterestStore {
    async fn increment(
        &self,
        user_id: i64,
        tags: &[String],
        weight: f64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }

        // Lock rows in a fixed order so two bumps over overlapping tags
        // cannot deadlock each other
        let mut ordered: Vec<&String> = tags.iter().collect();
        ordered.sort();

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!(user_id, "Failed to open interest transaction: {}", e);
            AppError::Database(e.to_string())
        })?;

        for tag in ordered {
            sqlx::query(
                r#"
                INSERT INTO user_interests (user_id, tag, score, last_updated_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, tag) DO UPDATE
                SET score = user_interests.score + EXCLUDED.score,
                    last_updated_at = EXCLUDED.last_updated_at
                "#,
            )
            .bind(user_id)
            .bind(tag)
            .bind(weight)
            .bind(updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(user_id, tag = %tag, "Failed to increment interest: {}", e);
                AppError::Database(e.to_string())
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!(user_id, "Failed to commit interest transaction: {}", e);
            AppError::Database(e.to_string())
        })?;

        Ok(())
    }

    async fn top(&self, user_id: i64, limit: usize) -> Result<Vec<InterestScore>> {
        let rows = sqlx::query_as::<_, (i64, String, f64, DateTime<Utc>)>(
            r#"
            SELECT user_id, tag, score, last_updated_at
            FROM user_interests
            WHERE user_id = $1
            ORDER BY score DESC, tag ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(user_id, "Failed to load top interests: {}", e);
            AppError::Database(e.to_string())
        })?
        .into_iter()
        .map(|(user_id, tag, score, last_updated_at)| InterestScore {
            user_id,
            tag,
            score,
            last_updated_at,
        })
        .collect();

        Ok(rows)
    }
}
