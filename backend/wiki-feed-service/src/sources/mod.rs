//! External content sources
//!
//! The feed core only ever talks to a [`ContentSource`]. Production wiring is
//! `GuardedSource<WikipediaSource>`: the guard bounds every call with a
//! timeout and fails fast while the upstream is degraded.

pub mod guard;
pub mod wikipedia;

pub use guard::{BreakerState, GuardConfig, GuardedSource};
pub use wikipedia::WikipediaSource;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Article as returned by the upstream, before any caching limits apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawContent {
    pub title: String,
    pub summary: String,
    pub images: Vec<String>,
    pub links: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Topic not found: {0}")]
    NotFound(String),

    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    /// Label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::NotFound(_) => "not_found",
            SourceError::RateLimited => "rate_limited",
            SourceError::Network(_) => "network",
            SourceError::Unavailable(_) => "unavailable",
            SourceError::Timeout(_) => "timeout",
        }
    }

    /// Whether the failure says something about upstream health.
    ///
    /// A missing article is an answer, not an outage.
    pub fn is_upstream_failure(&self) -> bool {
        !matches!(self, SourceError::NotFound(_))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Title of an arbitrary article, used by the cold-start path
    async fn random_topic(&self) -> Result<String, SourceError>;

    /// Full article for a title
    async fn fetch(&self, title: &str) -> Result<RawContent, SourceError>;
}
