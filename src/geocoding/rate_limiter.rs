//! Rate limiter for geocoder requests.
//!
//! Nominatim's usage policy allows at most one request per second per
//! application, so lookups from all users share a single limiter.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Rate limiter that enforces minimum intervals between requests.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between allowed requests.
    min_interval: Duration,

    /// Last time a request was sent.
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until a request is allowed, then marks it as sent.
    ///
    /// Returns the duration waited (0 if no wait was needed). Concurrent
    /// callers queue on the lock and are released one interval apart.
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut last = self.last_request.lock().await;

        let wait_duration = last.map_or(Duration::ZERO, |last_time| {
            self.min_interval.saturating_sub(last_time.elapsed())
        });

        if !wait_duration.is_zero() {
            debug!("Geocoder rate limit: waiting {:?}", wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        *last = Some(Instant::now());
        wait_duration
    }
}
