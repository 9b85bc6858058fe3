//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wiki_feed::db::{MemoryContentStore, MemoryInterestStore};
use wiki_feed::services::{
    CacheConfig, ContentCache, EngagementRecorder, FeedConfig, FeedGenerator, InterestConfig,
    InterestLedger,
};
use wiki_feed::sources::{ContentSource, RawContent, SourceError};

/// Source with a queue of random titles and a catalogue of known articles.
///
/// Unknown titles are synthesized; the queue falls back to numbered titles
/// once drained.
#[derive(Default)]
pub struct ScriptedSource {
    random: Mutex<VecDeque<String>>,
    articles: Mutex<HashMap<String, RawContent>>,
    counter: AtomicUsize,
    pub fetches: AtomicUsize,
    pub random_calls: AtomicUsize,
    pub down: AtomicBool,
    pub delay: Mutex<Duration>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_random(&self, titles: &[&str]) {
        self.random
            .lock()
            .extend(titles.iter().map(|t| t.to_string()));
    }

    pub fn add_article(&self, title: &str, categories: &[&str], related: &[&str]) {
        self.articles.lock().insert(
            title.to_string(),
            RawContent {
                title: title.to_string(),
                summary: format!("{} is an article.", title),
                images: vec![],
                links: related.iter().map(|s| s.to_string()).collect(),
                categories: categories.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn random_topic(&self) -> Result<String, SourceError> {
        self.random_calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("scripted outage".into()));
        }
        if let Some(title) = self.random.lock().pop_front() {
            return Ok(title);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("Generated Article {}", n))
    }

    async fn fetch(&self, title: &str) -> Result<RawContent, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(SourceError::Network("scripted outage".into()));
        }
        let known = self.articles.lock().get(title).cloned();
        Ok(known.unwrap_or_else(|| RawContent {
            title: title.to_string(),
            summary: format!("{} is an article.", title),
            images: vec![format!("https://upload.example/{}.jpg", title.replace(' ', "_"))],
            links: vec![],
            categories: vec![],
        }))
    }
}

/// Fully wired engine over in-memory stores
pub struct Engine {
    pub source: Arc<ScriptedSource>,
    pub content: Arc<MemoryContentStore>,
    pub interests: Arc<MemoryInterestStore>,
    pub cache: ContentCache,
    pub ledger: InterestLedger,
    pub feed: FeedGenerator,
    pub recorder: EngagementRecorder,
}

impl Engine {
    pub fn new() -> Self {
        let source = Arc::new(ScriptedSource::new());
        let content = Arc::new(MemoryContentStore::new());
        let interests = Arc::new(MemoryInterestStore::new());

        let cache = ContentCache::new(content.clone(), source.clone(), CacheConfig::default());
        let ledger = InterestLedger::new(interests.clone(), InterestConfig::default());
        let feed = FeedGenerator::new(cache.clone(), ledger.clone(), FeedConfig::default());
        let recorder = EngagementRecorder::new(content.clone(), ledger.clone());

        Self {
            source,
            content,
            interests,
            cache,
            ledger,
            feed,
            recorder,
        }
    }
}
