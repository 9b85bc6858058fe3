/// In-process stores
///
/// DashMap entries are locked per shard for the duration of an `entry()`
/// call, which gives the same per-key atomicity as the SQL upserts.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Ordering;

use super::{ContentStore, InterestStore};
use crate::error::Result;
use crate::models::{ContentRecord, InterestScore};

#[derive(Default)]
pub struct MemoryContentStore {
    records: DashMap<String, ContentRecord>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>> {
        Ok(self.records.get(content_id).map(|r| r.value().clone()))
    }

    async fn record_hit(
        &self,
        content_id: &str,
        accessed_at: DateTime<Utc>,
    ) -> Result<Option<ContentRecord>> {
        Ok(self.records.get_mut(content_id).map(|mut r| {
            r.access_count += 1;
            r.last_accessed_at = accessed_at;
            r.value().clone()
        }))
    }

    async fn insert_if_absent(&self, record: &ContentRecord) -> Result<bool> {
        match self.records.entry(record.content_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryInterestStore {
    scores: DashMap<(i64, String), InterestScore>,
}

impl MemoryInterestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, user_id: i64, tag: &str) -> Option<f64> {
        self.scores
            .get(&(user_id, tag.to_string()))
            .map(|s| s.score)
    }
}

#[async_trait]
impl InterestStore for MemoryInterestStore {
    async fn increment(
        &self,
        user_id: i64,
        tags: &[String],
        weight: f64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        for tag in tags {
            self.scores
                .entry((user_id, tag.clone()))
                .and_modify(|s| {
                    s.score += weight;
                    s.last_updated_at = updated_at;
                })
                .or_insert_with(|| InterestScore {
                    user_id,
                    tag: tag.clone(),
                    score: weight,
                    last_updated_at: updated_at,
                });
        }
        Ok(())
    }

    async fn top(&self, user_id: i64, limit: usize) -> Result<Vec<InterestScore>> {
        let mut scores: Vec<InterestScore> = self
            .scores
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.value().clone())
            .collect();

        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.tag.cmp(&b.tag))
        });
        scores.truncate(limit);
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ContentRecord {
        let now = Utc::now();
        ContentRecord {
            content_id: id.to_string(),
            title: "Heat".to_string(),
            summary: "Heat is energy...".to_string(),
            image_url: None,
            related_tags: vec![],
            categories: vec![],
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_if_absent_rejects_second_writer() {
        let store = MemoryContentStore::new();
        assert!(store.insert_if_absent(&record("a")).await.unwrap());
        assert!(!store.insert_if_absent(&record("a")).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_record_hit_increments() {
        let store = MemoryContentStore::new();
        store.insert_if_absent(&record("a")).await.unwrap();

        let first = store.record_hit("a", Utc::now()).await.unwrap().unwrap();
        let second = store.record_hit("a", Utc::now()).await.unwrap().unwrap();
        assert_eq!(first.access_count, 1);
        assert_eq!(second.access_count, 2);
        assert!(store.record_hit("missing", Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_does_not_touch_stats() {
        let store = MemoryContentStore::new();
        store.insert_if_absent(&record("a")).await.unwrap();

        store.get("a").await.unwrap();
        let fetched = store.get("a").await.unwrap().unwrap();
        assert_eq!(fetched.access_count, 0);
    }

    #[tokio::test]
    async fn test_top_orders_by_score_then_tag() {
        let store = MemoryInterestStore::new();
        let now = Utc::now();
        store
            .increment(1, &["b".to_string(), "a".to_string()], 1.0, now)
            .await
            .unwrap();
        store.increment(1, &["c".to_string()], 3.0, now).await.unwrap();
        store.increment(2, &["z".to_string()], 9.0, now).await.unwrap();

        let top = store.top(1, 2).await.unwrap();
        let tags: Vec<&str> = top.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["c", "a"]);
    }
}
