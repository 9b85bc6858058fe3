//! Feed Engine Metrics
//!
//! Prometheus metrics for the content cache, the upstream source, the
//! interest ledger and feed generation

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Duration;

static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "content_cache_lookups_total",
        "Content cache lookups by outcome (hit/miss/coalesced/fetch_failed)",
        &["outcome"]
    )
    .expect("Failed to register content cache lookups metric")
});

static SOURCE_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "content_source_requests_total",
        "Upstream content source requests",
        &["operation", "status"]
    )
    .expect("Failed to register content source requests metric")
});

static SOURCE_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "content_source_request_duration_seconds",
        "Latency of upstream content source requests",
        &["operation"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register content source duration metric")
});

static INTEREST_BUMPS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "interest_ledger_bumps_total",
        "Interest ledger bump calls"
    )
    .expect("Failed to register interest bumps metric")
});

static INTEREST_TAGS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "interest_ledger_tags_total",
        "Tag increments applied by the interest ledger"
    )
    .expect("Failed to register interest tags metric")
});

static FEED_ATTEMPTS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "feed_generation_attempts",
        "Sampling attempts spent per feed generation",
        vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .expect("Failed to register feed attempts metric")
});

static FEED_ITEMS_SERVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_items_served_total",
        "Feed items accepted into a response, by sampling branch",
        &["branch"]
    )
    .expect("Failed to register feed items metric")
});

/// Record a content cache lookup outcome
pub fn record_cache_lookup(outcome: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record one upstream request and how long it took
pub fn record_source_request(operation: &str, status: &str, duration: Duration) {
    SOURCE_REQUESTS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
    SOURCE_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record one ledger bump touching `tags` tags
pub fn record_interest_bump(tags: usize) {
    INTEREST_BUMPS_TOTAL.inc();
    INTEREST_TAGS_TOTAL.inc_by(tags as u64);
}

/// Record the attempt budget spent by one generation
pub fn record_feed_attempts(attempts: usize) {
    FEED_ATTEMPTS.observe(attempts as f64);
}

/// Record an accepted feed item
pub fn record_feed_item(branch: &str) {
    FEED_ITEMS_SERVED_TOTAL.with_label_values(&[branch]).inc();
}

/// Render the default registry in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        record_cache_lookup("hit");
        record_feed_item("cold_start");

        let text = render().unwrap();
        assert!(text.contains("content_cache_lookups_total"));
        assert!(text.contains("feed_items_served_total"));
    }
}
