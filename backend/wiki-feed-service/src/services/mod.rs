//! Service layer for wiki-feed-service
//!
//! - content_cache: cache-aside lookups with single-flight fills
//! - interest_ledger: per-user tag scores
//! - feed_generator: mixes interest and cold-start lookups into pages
//! - engagement: turns user actions into interest bumps

pub mod content_cache;
pub mod engagement;
pub mod feed_generator;
pub mod interest_ledger;

pub use content_cache::{CacheConfig, ContentCache};
pub use engagement::{EngagementEvent, EngagementRecorder};
pub use feed_generator::{FeedConfig, FeedGenerator};
pub use interest_ledger::{InterestConfig, InterestLedger};
