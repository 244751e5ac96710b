//! Metrics and tracing hooks for the request engine.

use crate::resilience::RateLimitInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Counters for requests, rate-limit waits and pages.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_failed: AtomicU64,
    secondary_waits: AtomicU64,
    primary_waits: AtomicU64,
    rate_limit_retries: AtomicU64,
    pages_fetched: AtomicU64,
}

impl Metrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request sent over the transport.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request that ended in an error.
    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a `retry-after` wait.
    pub fn record_secondary_wait(&self) {
        self.secondary_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a primary-limit backoff wait.
    pub fn record_primary_wait(&self) {
        self.primary_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request re-sent after a rate-limit wait.
    pub fn record_rate_limit_retry(&self) {
        self.rate_limit_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a page handed to the pagination engine.
    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            secondary_waits: self.secondary_waits.load(Ordering::Relaxed),
            primary_waits: self.primary_waits.load(Ordering::Relaxed),
            rate_limit_retries: self.rate_limit_retries.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
        }
    }

    /// Resets all metrics.
    pub fn reset(&self) {
        self.requests_total.store(0, Ordering::Relaxed);
        self.requests_failed.store(0, Ordering::Relaxed);
        self.secondary_waits.store(0, Ordering::Relaxed);
        self.primary_waits.store(0, Ordering::Relaxed);
        self.rate_limit_retries.store(0, Ordering::Relaxed);
        self.pages_fetched.store(0, Ordering::Relaxed);
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests sent.
    pub requests_total: u64,
    /// Requests that failed.
    pub requests_failed: u64,
    /// `retry-after` waits.
    pub secondary_waits: u64,
    /// Primary-limit waits.
    pub primary_waits: u64,
    /// Requests re-sent after a wait.
    pub rate_limit_retries: u64,
    /// Pages fetched through `fetch_page`.
    pub pages_fetched: u64,
}

/// Tracing hooks for engine events.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    pub fn on_request_start(method: &str, url: &str) {
        debug!(method = %method, url = %url, "GitHub API request started");
    }

    /// Logs the completion of an API request.
    pub fn on_request_complete(method: &str, url: &str, status: u16, duration: Duration) {
        debug!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "GitHub API request completed"
        );
    }

    /// Logs a `retry-after` wait.
    pub fn on_secondary_rate_limit(wait: Duration, info: Option<&RateLimitInfo>) {
        match info {
            Some(info) => warn!(
                wait_ms = wait.as_millis() as u64,
                limit = info.limit,
                remaining = info.remaining,
                reset_at = %info.reset_at,
                resource = %info.resource,
                used = info.used,
                "Secondary rate limit hit, honoring retry-after"
            ),
            None => warn!(
                wait_ms = wait.as_millis() as u64,
                "Secondary rate limit hit, honoring retry-after"
            ),
        }
    }

    /// Logs a primary-limit backoff wait.
    pub fn on_primary_rate_limit(wait: Duration, info: Option<&RateLimitInfo>) {
        match info {
            Some(info) => warn!(
                wait_ms = wait.as_millis() as u64,
                limit = info.limit,
                remaining = info.remaining,
                reset_at = %info.reset_at,
                resource = %info.resource,
                used = info.used,
                "Primary rate limit exhausted, backing off"
            ),
            None => warn!(
                wait_ms = wait.as_millis() as u64,
                "Primary rate limit exhausted, backing off"
            ),
        }
    }

    /// Logs the page count discovered from a Link header.
    pub fn on_pages_discovered(start_page: u32, total_pages: u32, per_page: u32) {
        debug!(
            start_page = start_page,
            total_pages = total_pages,
            per_page = per_page,
            "Fetching remaining pages"
        );
    }

    /// Logs an early exit from predicate-driven pagination.
    pub fn on_predicate_matched(page: u32, pages_requested: usize) {
        debug!(
            page = page,
            pages_requested = pages_requested,
            "Predicate satisfied, stopping pagination"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot() {
        let metrics = Metrics::new();

        metrics.record_request();
        metrics.record_request();
        metrics.record_failure();
        metrics.record_primary_wait();
        metrics.record_rate_limit_retry();
        metrics.record_page();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.requests_failed, 1);
        assert_eq!(snapshot.primary_waits, 1);
        assert_eq!(snapshot.secondary_waits, 0);
        assert_eq!(snapshot.rate_limit_retries, 1);
        assert_eq!(snapshot.pages_fetched, 1);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = Metrics::new();
        metrics.record_request();
        metrics.record_secondary_wait();
        metrics.reset();

        assert_eq!(metrics.snapshot(), Metrics::new().snapshot());
    }
}
