use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached article, keyed by the digest of the requested topic title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub content_id: String,
    pub title: String,
    /// Summary already truncated, including the trailing marker
    pub summary: String,
    pub image_url: Option<String>,
    pub related_tags: Vec<String>,
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Number of cache hits served; zero as inserted
    pub access_count: i64,
}

impl ContentRecord {
    /// Project the record into the shape returned by the feed API
    pub fn to_feed_item(&self) -> FeedItem {
        FeedItem {
            content_id: self.content_id.clone(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            image: self.image_url.clone(),
            related: self.related_tags.clone(),
            categories: self.categories.clone(),
            is_liked: false,
            comment_count: 0,
        }
    }
}

/// Feed entry sent to clients
///
/// `is_liked` and `comment_count` are viewer-specific and are filled in by
/// whoever owns likes and comments; the feed core leaves them at their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub content_id: String,
    pub title: String,
    pub summary: String,
    pub image: Option<String>,
    #[serde(default)]
    pub related: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub comment_count: i64,
}

/// Accumulated affinity of one user for one tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestScore {
    pub user_id: i64,
    pub tag: String,
    pub score: f64,
    pub last_updated_at: DateTime<Utc>,
}

/// Feed response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub items: Vec<FeedItem>,
}
