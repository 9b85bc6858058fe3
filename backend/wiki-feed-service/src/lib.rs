pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};

pub use services::{
    CacheConfig, ContentCache, EngagementEvent, EngagementRecorder, FeedConfig, FeedGenerator,
    InterestConfig, InterestLedger,
};
pub use sources::{ContentSource, GuardedSource, RawContent, SourceError, WikipediaSource};
