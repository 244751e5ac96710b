//! Rate limit handling for the GitHub API.
//!
//! [`RateLimitMonitor`] inspects every response for GitHub's two throttling
//! signals and suspends the caller until the next request may proceed:
//!
//! 1. `retry-after` (secondary/abuse limit): wait exactly that many seconds.
//! 2. `x-ratelimit-remaining: 0` on a 403/429 (primary limit): wait for the
//!    current backoff, then grow the backoff by the configured multiplier.
//!
//! A rate limit never surfaces as an error from the monitor; it always
//! resolves by waiting. The monitor also gates admission so that no more than
//! `max_in_flight` requests from one client are outstanding at once.

use crate::client::ResponseMeta;
use crate::config::RateLimitConfig;
use crate::errors::{GitHubError, GitHubResult};
use crate::observability::TracingHooks;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;

/// Maximum requests allowed in the current window.
pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
/// Requests remaining in the current window.
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
/// Window reset time in epoch seconds.
pub const HEADER_RESET: &str = "x-ratelimit-reset";
/// Rate limit resource bucket (`core`, `search`, ...).
pub const HEADER_RESOURCE: &str = "x-ratelimit-resource";
/// Requests used in the current window.
pub const HEADER_USED: &str = "x-ratelimit-used";
/// Secondary rate limit wait in seconds.
pub const HEADER_RETRY_AFTER: &str = "retry-after";

/// Rate limit information read from response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed.
    pub limit: u32,
    /// Remaining requests in current window.
    pub remaining: u32,
    /// Time when the rate limit resets.
    pub reset_at: DateTime<Utc>,
    /// Resource category.
    pub resource: String,
    /// Requests used in current window.
    pub used: u32,
}

impl RateLimitInfo {
    /// Extracts all five `x-ratelimit-*` headers.
    ///
    /// Fails with `RateLimitHeaderMissing` naming the first header that is
    /// absent or unparsable.
    pub fn from_headers(headers: &HeaderMap) -> GitHubResult<Self> {
        let limit = parse_header(headers, HEADER_LIMIT)?;
        let remaining = parse_header(headers, HEADER_REMAINING)?;
        let reset_timestamp: i64 = parse_header(headers, HEADER_RESET)?;
        let reset_at = DateTime::from_timestamp(reset_timestamp, 0)
            .ok_or_else(|| GitHubError::missing_rate_limit_header(HEADER_RESET))?;
        let resource = header_str(headers, HEADER_RESOURCE)
            .map(String::from)
            .ok_or_else(|| GitHubError::missing_rate_limit_header(HEADER_RESOURCE))?;
        let used = parse_header(headers, HEADER_USED)?;

        Ok(Self {
            limit,
            remaining,
            reset_at,
            resource,
            used,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn parse_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> GitHubResult<T> {
    header_str(headers, name)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| GitHubError::missing_rate_limit_header(name))
}

/// What the monitor did after inspecting a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    /// No throttling signal; nothing was awaited.
    Clear,
    /// Waited for a `retry-after` interval.
    SecondaryWait(Duration),
    /// Waited for the primary-limit backoff.
    PrimaryWait(Duration),
}

impl RateLimitOutcome {
    /// Returns true if the monitor suspended the caller.
    pub fn waited(&self) -> bool {
        !matches!(self, Self::Clear)
    }

    /// Returns the duration waited, if any.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Self::Clear => None,
            Self::SecondaryWait(d) | Self::PrimaryWait(d) => Some(*d),
        }
    }
}

/// Per-client rate limit state: backoff accumulator and in-flight counter.
#[derive(Debug)]
pub struct RateLimitMonitor {
    config: RateLimitConfig,
    backoff_ms: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    latest: RwLock<Option<RateLimitInfo>>,
}

impl RateLimitMonitor {
    /// Creates a monitor with its backoff at the configured default.
    pub fn new(config: RateLimitConfig) -> Self {
        let backoff_ms = AtomicU64::new(config.default_backoff.as_millis() as u64);
        Self {
            config,
            backoff_ms,
            in_flight: Arc::new(AtomicUsize::new(0)),
            latest: RwLock::new(None),
        }
    }

    /// Gets the wait the next primary-limit hit will use.
    pub fn current_backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms.load(Ordering::SeqCst))
    }

    /// Resets the backoff to the default.
    ///
    /// Call at the start of each logical multi-request operation so growth
    /// from a previous operation does not carry over.
    pub fn reset_backoff(&self) {
        let default_ms = self.config.default_backoff.as_millis() as u64;
        self.backoff_ms.store(default_ms, Ordering::SeqCst);
    }

    /// Number of requests currently admitted and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most recent complete set of rate limit headers seen.
    pub async fn latest(&self) -> Option<RateLimitInfo> {
        self.latest.read().await.clone()
    }

    /// Waits until fewer than `max_in_flight` requests are outstanding and
    /// claims a slot. The slot is released when the guard is dropped.
    pub async fn admit(&self) -> InFlightGuard {
        loop {
            let current = self.in_flight.load(Ordering::SeqCst);
            if current < self.config.max_in_flight {
                if self
                    .in_flight
                    .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    return InFlightGuard {
                        counter: self.in_flight.clone(),
                    };
                }
                continue;
            }

            tracing::debug!(
                in_flight = current,
                max_in_flight = self.config.max_in_flight,
                "Request admission deferred"
            );
            sleep(self.config.admission_poll_interval).await;
        }
    }

    /// Inspects a completed response and waits if GitHub asked us to.
    ///
    /// Only returns an error when `require_rate_limit_headers` is set and a
    /// primary-limit signal arrives without the full header set.
    pub async fn inspect(&self, response: &ResponseMeta) -> GitHubResult<RateLimitOutcome> {
        let headers = response.headers();
        let info = RateLimitInfo::from_headers(headers);
        if let Ok(ref info) = info {
            *self.latest.write().await = Some(info.clone());
        }

        if let Some(seconds) = self.retry_after(headers) {
            let wait = Duration::from_secs(seconds);
            TracingHooks::on_secondary_rate_limit(wait, info.as_ref().ok());
            sleep(wait).await;
            return Ok(RateLimitOutcome::SecondaryWait(wait));
        }

        if Self::primary_exhausted(response) {
            let info = match info {
                Ok(info) => Some(info),
                Err(e) if self.config.require_rate_limit_headers => return Err(e),
                Err(e) => {
                    tracing::debug!(error = %e, "Primary rate limit hit with incomplete headers");
                    None
                }
            };

            let wait = self.current_backoff();
            TracingHooks::on_primary_rate_limit(wait, info.as_ref());
            sleep(wait).await;
            self.grow_backoff(wait);
            return Ok(RateLimitOutcome::PrimaryWait(wait));
        }

        Ok(RateLimitOutcome::Clear)
    }

    /// Returns true if the response reports an exhausted primary quota.
    pub fn primary_exhausted(response: &ResponseMeta) -> bool {
        matches!(response.status(), 403 | 429)
            && header_str(response.headers(), HEADER_REMAINING) == Some("0")
    }

    fn retry_after(&self, headers: &HeaderMap) -> Option<u64> {
        let raw = header_str(headers, HEADER_RETRY_AFTER)?;
        match raw.parse() {
            Ok(seconds) => Some(seconds),
            Err(_) => {
                tracing::debug!(value = raw, "Ignoring non-numeric retry-after header");
                None
            }
        }
    }

    /// Grows the backoff once per rate limit episode.
    ///
    /// Concurrent requests that waited on the same backoff all pass the same
    /// `waited`; only the first to finish moves the accumulator.
    fn grow_backoff(&self, waited: Duration) {
        let waited_ms = waited.as_millis() as u64;
        let grown = (waited_ms as f64 * self.config.backoff_multiplier).round() as u64;
        let _ = self
            .backoff_ms
            .compare_exchange(waited_ms, grown, Ordering::SeqCst, Ordering::SeqCst);
    }
}

impl Default for RateLimitMonitor {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// An admitted in-flight request slot.
#[derive(Debug)]
pub struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
