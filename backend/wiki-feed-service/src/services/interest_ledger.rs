//! Interest ledger
//!
//! Accumulates per-user tag affinity from engagement. Scores only grow;
//! every bump adds the same weight to each supplied tag.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::db::InterestStore;
use crate::error::Result;
use crate::metrics;
use crate::models::{ContentRecord, InterestScore};
use crate::utils::truncate_chars;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestConfig {
    /// Categories of an article that become tags
    pub max_categories: usize,
    /// Related topics of an article that become tags
    pub max_related: usize,
    /// Upper bound on tags per bump
    pub max_tags: usize,
    pub max_tag_chars: usize,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            max_categories: 10,
            max_related: 5,
            max_tags: 15,
            max_tag_chars: 50,
        }
    }
}

#[derive(Clone)]
pub struct InterestLedger {
    store: Arc<dyn InterestStore>,
    config: InterestConfig,
}

impl InterestLedger {
    pub fn new(store: Arc<dyn InterestStore>, config: InterestConfig) -> Self {
        Self { store, config }
    }

    /// Tags an engagement with `record` should credit: categories first,
    /// then related topics.
    pub fn tags_for(&self, record: &ContentRecord) -> Vec<String> {
        record
            .categories
            .iter()
            .take(self.config.max_categories)
            .chain(record.related_tags.iter().take(self.config.max_related))
            .cloned()
            .collect()
    }

    /// Add `weight` to every tag for the user.
    ///
    /// Tags past the cap are dropped, long tags are cut to the column width.
    /// A tag listed twice is credited twice.
    pub async fn bump(&self, user_id: i64, tags: &[String], weight: f64) -> Result<()> {
        let tags: Vec<String> = tags
            .iter()
            .take(self.config.max_tags)
            .map(|t| truncate_chars(t, self.config.max_tag_chars).to_string())
            .collect();

        if tags.is_empty() {
            return Ok(());
        }

        self.store
            .increment(user_id, &tags, weight, Utc::now())
            .await?;

        debug!(user_id, tags = tags.len(), weight, "Interest scores bumped");
        metrics::record_interest_bump(tags.len());
        Ok(())
    }

    /// Highest-scoring tags for the user, best first
    pub async fn top_interests(&self, user_id: i64, limit: usize) -> Result<Vec<InterestScore>> {
        self.store.top(user_id, limit).await
    }
}
