/// Timeout and circuit breaker in front of a content source
///
/// State transitions:
/// - Closed → Open: after `failure_threshold` consecutive upstream failures
/// - Open → HalfOpen: once `cooldown` has elapsed
/// - HalfOpen → Closed: on the first success
/// - HalfOpen → Open: on any upstream failure
///
/// `NotFound` answers are passed through without touching the breaker.
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{ContentSource, RawContent, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Upper bound for one upstream call
    pub timeout: Duration,
    /// Consecutive upstream failures that open the breaker
    pub failure_threshold: u32,
    /// How long the breaker stays open before letting a probe through
    pub cooldown: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

struct Breaker {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

pub struct GuardedSource<S> {
    inner: S,
    config: GuardConfig,
    breaker: Mutex<Breaker>,
}

impl<S: ContentSource> GuardedSource<S> {
    pub fn new(inner: S, config: GuardConfig) -> Self {
        Self {
            inner,
            config,
            breaker: Mutex::new(Breaker {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.breaker.lock().state
    }

    async fn guarded<T, F>(&self, operation: &'static str, call: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        if self.should_reject() {
            return Err(SourceError::Unavailable(format!(
                "{} rejected: circuit open",
                operation
            )));
        }

        let result = match tokio::time::timeout(self.config.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.config.timeout)),
        };

        match &result {
            Ok(_) => self.record_success(),
            Err(e) if e.is_upstream_failure() => self.record_failure(operation, e),
            Err(_) => {}
        }

        result
    }

    fn should_reject(&self) -> bool {
        let mut breaker = self.breaker.lock();
        let state = breaker.state;

        match state {
            BreakerState::Open => match breaker.opened_at {
                Some(opened_at) if opened_at.elapsed() >= self.config.cooldown => {
                    info!("Content source breaker: Open → HalfOpen");
                    breaker.state = BreakerState::HalfOpen;
                    false
                }
                _ => true,
            },
            BreakerState::HalfOpen | BreakerState::Closed => false,
        }
    }

    fn record_success(&self) {
        let mut breaker = self.breaker.lock();
        breaker.consecutive_failures = 0;

        if breaker.state == BreakerState::HalfOpen {
            info!("Content source breaker: HalfOpen → Closed");
            breaker.state = BreakerState::Closed;
            breaker.opened_at = None;
        }
    }

    fn record_failure(&self, operation: &str, error: &SourceError) {
        let mut breaker = self.breaker.lock();
        breaker.consecutive_failures += 1;
        let state = breaker.state;

        match state {
            BreakerState::Closed if breaker.consecutive_failures >= self.config.failure_threshold => {
                warn!(
                    operation,
                    failures = breaker.consecutive_failures,
                    error = %error,
                    "Content source breaker: Closed → Open"
                );
                breaker.state = BreakerState::Open;
                breaker.opened_at = Some(Instant::now());
            }
            BreakerState::HalfOpen => {
                warn!(operation, error = %error, "Content source breaker: HalfOpen → Open");
                breaker.state = BreakerState::Open;
                breaker.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }
}

#[async_trait]
impl<S: ContentSource> ContentSource for GuardedSource<S> {
    async fn random_topic(&self) -> Result<String, SourceError> {
        self.guarded("random_topic", self.inner.random_topic()).await
    }

    async fn fetch(&self, title: &str) -> Result<RawContent, SourceError> {
        self.guarded("fetch", self.inner.fetch(title)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockContentSource;

    fn config(threshold: u32, cooldown: Duration) -> GuardConfig {
        GuardConfig {
            timeout: Duration::from_secs(1),
            failure_threshold: threshold,
            cooldown,
        }
    }

    #[tokio::test]
    async fn test_passes_through_success() {
        let mut mock = MockContentSource::new();
        mock.expect_random_topic()
            .returning(|| Ok("Entropy".to_string()));

        let guard = GuardedSource::new(mock, GuardConfig::default());
        let title = tokio_test::assert_ok!(guard.random_topic().await);
        assert_eq!(title, "Entropy");
        assert_eq!(guard.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let mut mock = MockContentSource::new();
        mock.expect_fetch()
            .times(3)
            .returning(|_| Err(SourceError::Network("connection reset".into())));

        let guard = GuardedSource::new(mock, config(3, Duration::from_secs(60)));
        for _ in 0..3 {
            assert!(guard.fetch("Finance").await.is_err());
        }
        assert_eq!(guard.state(), BreakerState::Open);

        // Fails fast without reaching the mock (times(3) would panic otherwise)
        let err = guard.fetch("Finance").await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_not_found_does_not_trip() {
        let mut mock = MockContentSource::new();
        mock.expect_fetch()
            .returning(|t| Err(SourceError::NotFound(t.to_string())));

        let guard = GuardedSource::new(mock, config(2, Duration::from_secs(60)));
        for _ in 0..5 {
            let err = guard.fetch("Nope").await.unwrap_err();
            assert!(matches!(err, SourceError::NotFound(_)));
        }
        assert_eq!(guard.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_probe_closes_on_success() {
        let mut mock = MockContentSource::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_random_topic()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|| Err(SourceError::RateLimited));
        mock.expect_random_topic()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok("Heat".to_string()));

        let guard = GuardedSource::new(mock, config(2, Duration::from_millis(50)));
        let _ = guard.random_topic().await;
        let _ = guard.random_topic().await;
        assert_eq!(guard.state(), BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(guard.random_topic().await.unwrap(), "Heat");
        assert_eq!(guard.state(), BreakerState::Closed);
    }

    struct SlowSource;

    #[async_trait]
    impl ContentSource for SlowSource {
        async fn random_topic(&self) -> Result<String, SourceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }

        async fn fetch(&self, _title: &str) -> Result<RawContent, SourceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(RawContent::default())
        }
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let guard = GuardedSource::new(
            SlowSource,
            GuardConfig {
                timeout: Duration::from_millis(20),
                failure_threshold: 1,
                cooldown: Duration::from_secs(60),
            },
        );

        let err = guard.fetch("Anything").await.unwrap_err();
        assert!(matches!(err, SourceError::Timeout(_)));
        assert_eq!(guard.state(), BreakerState::Open);
    }
}
