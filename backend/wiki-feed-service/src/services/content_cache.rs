//! Cache-aside store in front of the content source
//!
//! Lookup flow:
//! 1. Resolve the title (random topic when none was requested)
//! 2. Hit → bump access statistics atomically and return the updated record
//! 3. Miss → take the per-id lock, re-check, fetch, insert-if-absent
//!
//! Upstream failures never leave this module: callers see `Ok(None)`.
//! Storage failures propagate as `AppError::Database`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::db::ContentStore;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ContentRecord, FeedItem};
use crate::sources::{ContentSource, RawContent};
use crate::utils::{derive_content_id, truncate_chars};

/// Limits applied when an article is first cached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Characters of summary kept before the marker
    pub summary_max_chars: usize,
    /// Appended to every stored summary
    pub truncation_marker: String,
    pub max_related: usize,
    pub max_categories: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            summary_max_chars: 500,
            truncation_marker: "...".to_string(),
            max_related: 10,
            max_categories: 10,
        }
    }
}

impl CacheConfig {
    /// Build the record stored for a freshly fetched article
    pub fn build_record(&self, content_id: String, raw: RawContent, now: DateTime<Utc>) -> ContentRecord {
        let mut summary = truncate_chars(&raw.summary, self.summary_max_chars).to_string();
        summary.push_str(&self.truncation_marker);

        ContentRecord {
            content_id,
            title: raw.title,
            summary,
            image_url: raw.images.into_iter().next(),
            related_tags: raw.links.into_iter().take(self.max_related).collect(),
            categories: raw.categories.into_iter().take(self.max_categories).collect(),
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
        }
    }
}

/// Content cache shared by every request
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn ContentStore>,
    source: Arc<dyn ContentSource>,
    config: Arc<CacheConfig>,
    /// One lock per content id with a fill in progress
    in_flight: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ContentCache {
    pub fn new(
        store: Arc<dyn ContentStore>,
        source: Arc<dyn ContentSource>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            source,
            config: Arc::new(config),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Resolve a topic (or a random one) to a feed item.
    ///
    /// Returns `Ok(None)` when the upstream could not supply the article.
    pub async fn get_or_fetch(&self, topic: Option<&str>) -> Result<Option<FeedItem>> {
        let title = match topic.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => match self.source.random_topic().await {
                Ok(title) => title,
                Err(e) => {
                    warn!(error = %e, kind = e.kind(), "Random topic lookup failed");
                    metrics::record_cache_lookup("fetch_failed");
                    return Ok(None);
                }
            },
        };

        let content_id = derive_content_id(&title);

        if let Some(record) = self.store.record_hit(&content_id, Utc::now()).await? {
            debug!(content_id = %content_id, access_count = record.access_count, "Content cache hit");
            metrics::record_cache_lookup("hit");
            return Ok(Some(record.to_feed_item()));
        }

        // The fill runs on its own task: if this caller goes away, the fetch
        // and insert still finish and the lock is released.
        let cache = self.clone();
        let fill = tokio::spawn(async move { cache.fill(content_id, title).await });

        fill.await
            .map_err(|e| AppError::Internal(format!("Content fill task failed: {}", e)))?
    }

    /// Miss path, serialized per content id
    async fn fill(&self, content_id: String, title: String) -> Result<Option<FeedItem>> {
        let lock = self
            .in_flight
            .entry(content_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.fill_locked(&content_id, &title).await
        };

        drop(lock);
        self.in_flight
            .remove_if(&content_id, |_, l| Arc::strong_count(l) == 1);

        result
    }

    async fn fill_locked(&self, content_id: &str, title: &str) -> Result<Option<FeedItem>> {
        // Another task may have filled the id while we waited for the lock
        if let Some(record) = self.store.record_hit(content_id, Utc::now()).await? {
            debug!(content_id, "Content filled by concurrent request");
            metrics::record_cache_lookup("coalesced");
            return Ok(Some(record.to_feed_item()));
        }

        let raw = match self.source.fetch(title).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    content_id,
                    title,
                    kind = e.kind(),
                    error = %e,
                    "Content fetch failed"
                );
                metrics::record_cache_lookup("fetch_failed");
                return Ok(None);
            }
        };

        let record = self
            .config
            .build_record(content_id.to_string(), raw, Utc::now());

        if self.store.insert_if_absent(&record).await? {
            debug!(content_id, title = %record.title, "Content cached");
            metrics::record_cache_lookup("miss");
            return Ok(Some(record.to_feed_item()));
        }

        // Lost the insert race to another process; serve its row as a hit
        metrics::record_cache_lookup("coalesced");
        Ok(self
            .store
            .record_hit(content_id, Utc::now())
            .await?
            .map(|r| r.to_feed_item()))
    }

    /// Number of ids with a fill currently in progress
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}
