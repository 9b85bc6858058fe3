// ============================================
// Feed Generator
// ============================================
//
// Mixes interest-driven and cold-start lookups into one page:
//
//   top interests ──► interest branch ──┐
//                                        ├──► ContentCache ──► dedup ──► page
//   random topic ───► cold-start branch ─┘
//
// The interest branch fills at most floor(count * interest_share) slots and
// yields every `exploration_period`-th attempt to a random topic. Attempts are
// bounded by count * attempt_multiplier; a short page is not an error.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics;
use crate::models::FeedItem;
use crate::services::content_cache::ContentCache;
use crate::services::interest_ledger::InterestLedger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub page_size: usize,
    pub load_more_size: usize,
    /// Number of top interests sampled from
    pub interest_pool: usize,
    /// Fraction of a page reserved for interest-driven items
    pub interest_share: f64,
    /// Every n-th attempt goes to a random topic
    pub exploration_period: usize,
    pub attempt_multiplier: usize,
    /// Extra cold-start lookups when a load-more page comes back empty
    pub load_more_fallback_attempts: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            load_more_size: 3,
            interest_pool: 20,
            interest_share: 0.4,
            exploration_period: 3,
            attempt_multiplier: 10,
            load_more_fallback_attempts: 10,
        }
    }
}

impl FeedConfig {
    /// Slots of a `count`-item page the interest branch may fill
    pub fn interest_quota(&self, count: usize) -> usize {
        (count as f64 * self.interest_share).floor() as usize
    }

    pub fn max_attempts(&self, count: usize) -> usize {
        count.saturating_mul(self.attempt_multiplier)
    }

    fn explores(&self, attempt: usize) -> bool {
        self.exploration_period > 0 && attempt % self.exploration_period == 0
    }
}

#[derive(Clone)]
pub struct FeedGenerator {
    cache: ContentCache,
    ledger: InterestLedger,
    config: FeedConfig,
}

impl FeedGenerator {
    pub fn new(cache: ContentCache, ledger: InterestLedger, config: FeedConfig) -> Self {
        Self {
            cache,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Build up to `count` items for the user, skipping ids in `exclude`
    pub async fn generate(
        &self,
        user_id: i64,
        count: usize,
        exclude: &HashSet<String>,
    ) -> Result<Vec<FeedItem>> {
        let mut rng = StdRng::from_entropy();
        self.generate_with_rng(user_id, count, exclude, &mut rng)
            .await
    }

    /// `generate` with a caller-supplied random source for tag selection
    pub async fn generate_with_rng<R: Rng + Send>(
        &self,
        user_id: i64,
        count: usize,
        exclude: &HashSet<String>,
        rng: &mut R,
    ) -> Result<Vec<FeedItem>> {
        let interests = self
            .ledger
            .top_interests(user_id, self.config.interest_pool)
            .await?;

        let quota = self.config.interest_quota(count);
        let max_attempts = self.config.max_attempts(count);

        let mut seen: HashSet<String> = exclude.clone();
        let mut items = Vec::with_capacity(count);
        let mut attempts = 0;

        while items.len() < count && attempts < max_attempts {
            attempts += 1;

            let interest = if items.len() < quota && !self.config.explores(attempts) {
                interests.choose(rng)
            } else {
                None
            };
            let branch = if interest.is_some() {
                "interest"
            } else {
                "cold_start"
            };

            let item = self
                .cache
                .get_or_fetch(interest.map(|i| i.tag.as_str()))
                .await?;

            if let Some(item) = item {
                if seen.insert(item.content_id.clone()) {
                    debug!(
                        user_id,
                        content_id = %item.content_id,
                        branch,
                        attempt = attempts,
                        "Feed item accepted"
                    );
                    metrics::record_feed_item(branch);
                    items.push(item);
                }
            }
        }

        metrics::record_feed_attempts(attempts);
        info!(
            user_id,
            requested = count,
            served = items.len(),
            attempts,
            interests = interests.len(),
            "Feed generated"
        );

        Ok(items)
    }

    /// Smaller follow-up page. Falls back to plain random lookups when the
    /// regular generation comes back empty.
    pub async fn load_more(&self, user_id: i64, exclude: &HashSet<String>) -> Result<Vec<FeedItem>> {
        let items = self
            .generate(user_id, self.config.load_more_size, exclude)
            .await?;
        if !items.is_empty() {
            return Ok(items);
        }

        for _ in 0..self.config.load_more_fallback_attempts {
            if let Some(item) = self.cache.get_or_fetch(None).await? {
                if !exclude.contains(&item.content_id) {
                    metrics::record_feed_item("cold_start");
                    return Ok(vec![item]);
                }
            }
        }

        debug!(user_id, "Load more found nothing new");
        Ok(Vec::new())
    }
}
