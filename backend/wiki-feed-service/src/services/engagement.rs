//! Engagement intake
//!
//! Turns user actions on a feed item into interest bumps.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::db::ContentStore;
use crate::error::Result;
use crate::services::interest_ledger::InterestLedger;

const VIEW_MIN_SECONDS: f64 = 1.0;
const VIEW_WEIGHT_PER_SECOND: f64 = 0.1;
const VIEW_MAX_WEIGHT: f64 = 2.0;
const LIKE_WEIGHT: f64 = 10.0;
const COMMENT_WEIGHT: f64 = 5.0;
const SHARE_WEIGHT: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngagementEvent {
    /// Item stayed on screen for `duration` seconds
    View { duration: f64 },
    /// `created` is false when the like already existed or was removed
    Like {
        #[serde(default = "default_created")]
        created: bool,
    },
    Comment,
    Share,
}

fn default_created() -> bool {
    true
}

impl EngagementEvent {
    /// Interest weight of the event, or `None` when it should not count
    pub fn weight(&self) -> Option<f64> {
        match *self {
            EngagementEvent::View { duration } if duration > VIEW_MIN_SECONDS => {
                Some((duration * VIEW_WEIGHT_PER_SECOND).min(VIEW_MAX_WEIGHT))
            }
            EngagementEvent::View { .. } => None,
            EngagementEvent::Like { created: true } => Some(LIKE_WEIGHT),
            EngagementEvent::Like { created: false } => None,
            EngagementEvent::Comment => Some(COMMENT_WEIGHT),
            EngagementEvent::Share => Some(SHARE_WEIGHT),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngagementEvent::View { .. } => "view",
            EngagementEvent::Like { .. } => "like",
            EngagementEvent::Comment => "comment",
            EngagementEvent::Share => "share",
        }
    }
}

#[derive(Clone)]
pub struct EngagementRecorder {
    content: Arc<dyn ContentStore>,
    ledger: InterestLedger,
}

impl EngagementRecorder {
    pub fn new(content: Arc<dyn ContentStore>, ledger: InterestLedger) -> Self {
        Self { content, ledger }
    }

    /// Credit the content's tags to the user. Returns whether a bump was
    /// issued.
    pub async fn record(
        &self,
        user_id: i64,
        content_id: &str,
        event: &EngagementEvent,
    ) -> Result<bool> {
        let Some(weight) = event.weight() else {
            debug!(user_id, content_id, event = event.kind(), "Engagement below threshold");
            return Ok(false);
        };

        let Some(record) = self.content.get(content_id).await? else {
            debug!(user_id, content_id, event = event.kind(), "Engagement for unknown content");
            return Ok(false);
        };

        let tags = self.ledger.tags_for(&record);
        self.ledger.bump(user_id, &tags, weight).await?;

        debug!(
            user_id,
            content_id,
            event = event.kind(),
            weight,
            tags = tags.len(),
            "Engagement recorded"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryContentStore, MemoryInterestStore, MockContentStore};
    use crate::models::ContentRecord;
    use crate::services::interest_ledger::InterestConfig;
    use chrono::Utc;

    fn physics_record() -> ContentRecord {
        let now = Utc::now();
        ContentRecord {
            content_id: "c1".to_string(),
            title: "Thermodynamics".to_string(),
            summary: "Heat...".to_string(),
            image_url: None,
            related_tags: vec!["Entropy".to_string()],
            categories: vec!["Physics".to_string(), "Energy".to_string()],
            created_at: now,
            last_accessed_at: now,
            access_count: 3,
        }
    }

    async fn recorder() -> (EngagementRecorder, Arc<MemoryInterestStore>, Arc<MemoryContentStore>) {
        let content = Arc::new(MemoryContentStore::new());
        content.insert_if_absent(&physics_record()).await.unwrap();
        let interests = Arc::new(MemoryInterestStore::new());
        let ledger = InterestLedger::new(interests.clone(), InterestConfig::default());
        (
            EngagementRecorder::new(content.clone(), ledger),
            interests,
            content,
        )
    }

    #[test]
    fn test_weights() {
        assert_eq!(EngagementEvent::View { duration: 25.0 }.weight(), Some(2.0));
        assert_eq!(EngagementEvent::View { duration: 5.0 }.weight(), Some(0.5));
        assert_eq!(EngagementEvent::View { duration: 1.0 }.weight(), None);
        assert_eq!(EngagementEvent::Like { created: true }.weight(), Some(10.0));
        assert_eq!(EngagementEvent::Like { created: false }.weight(), None);
        assert_eq!(EngagementEvent::Comment.weight(), Some(5.0));
        assert_eq!(EngagementEvent::Share.weight(), Some(8.0));
    }

    #[test]
    fn test_event_deserialization() {
        let view: EngagementEvent =
            serde_json::from_str(r#"{"type":"view","duration":12.5}"#).unwrap();
        assert_eq!(view, EngagementEvent::View { duration: 12.5 });

        let like: EngagementEvent = serde_json::from_str(r#"{"type":"like"}"#).unwrap();
        assert_eq!(like, EngagementEvent::Like { created: true });

        let share: EngagementEvent = serde_json::from_str(r#"{"type":"share"}"#).unwrap();
        assert_eq!(share, EngagementEvent::Share);

        assert!(serde_json::from_str::<EngagementEvent>(r#"{"type":"poke"}"#).is_err());
    }

    #[tokio::test]
    async fn test_long_view_bumps_every_tag() {
        let (recorder, interests, _) = recorder().await;

        let recorded = recorder
            .record(1, "c1", &EngagementEvent::View { duration: 25.0 })
            .await
            .unwrap();

        assert!(recorded);
        for tag in ["Physics", "Energy", "Entropy"] {
            assert_eq!(interests.score(1, tag), Some(2.0));
        }
    }

    #[tokio::test]
    async fn test_recording_leaves_access_stats_alone() {
        let (recorder, _, content) = recorder().await;

        recorder.record(1, "c1", &EngagementEvent::Share).await.unwrap();
        let record = content.get("c1").await.unwrap().unwrap();
        assert_eq!(record.access_count, 3);
    }

    #[tokio::test]
    async fn test_unknown_content_is_noop() {
        let (recorder, interests, _) = recorder().await;

        let recorded = recorder
            .record(1, "missing", &EngagementEvent::Comment)
            .await
            .unwrap();
        assert!(!recorded);
        assert_eq!(interests.score(1, "Physics"), None);
    }

    #[tokio::test]
    async fn test_zero_weight_skips_lookup() {
        let mut content = MockContentStore::new();
        content.expect_get().times(0);
        let ledger = InterestLedger::new(
            Arc::new(MemoryInterestStore::new()),
            InterestConfig::default(),
        );
        let recorder = EngagementRecorder::new(Arc::new(content), ledger);

        let recorded = recorder
            .record(1, "c1", &EngagementEvent::View { duration: 0.5 })
            .await
            .unwrap();
        assert!(!recorded);
    }
}
