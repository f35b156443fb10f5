//! Request pacing and retry around a [`Geocoder`].
//!
//! The public Nominatim instance allows at most one request per second
//! and bans clients that hammer it. [`RateLimitedGeocoder`] spaces calls
//! at least [`RateLimitPolicy::min_delay`] apart and retries transient
//! failures a bounded number of times before handing the final error
//! back to the caller.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{GeocodeError, GeocodedPoint, Geocoder};

/// Pacing and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Minimum spacing between the start of two requests.
    pub min_delay: Duration,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Wait before retrying a failed request.
    pub error_wait: Duration,
    /// Wait before retrying after HTTP 429.
    pub rate_limited_wait: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1200),
            max_retries: 2,
            error_wait: Duration::from_secs(3),
            rate_limited_wait: Self::DEFAULT_RATE_LIMITED_WAIT,
        }
    }
}

impl RateLimitPolicy {
    /// Back-off after HTTP 429.
    pub const DEFAULT_RATE_LIMITED_WAIT: Duration = Duration::from_secs(60);

    /// No pacing and no retries.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_retries: 0,
            error_wait: Duration::ZERO,
            rate_limited_wait: Duration::ZERO,
        }
    }

    const fn wait_for(&self, error: &GeocodeError) -> Duration {
        match error {
            GeocodeError::RateLimited => self.rate_limited_wait,
            _ => self.error_wait,
        }
    }
}

/// Wraps a geocoder with request spacing and bounded retries.
#[derive(Debug)]
pub struct RateLimitedGeocoder<G> {
    inner: G,
    policy: RateLimitPolicy,
    next_slot: Mutex<Option<Instant>>,
}

impl<G: Geocoder> RateLimitedGeocoder<G> {
    #[must_use]
    pub const fn new(inner: G, policy: RateLimitPolicy) -> Self {
        Self {
            inner,
            policy,
            next_slot: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn inner(&self) -> &G {
        &self.inner
    }

    /// Reserves the next request slot and sleeps until it opens.
    async fn pace(&self) {
        let wait = {
            let mut next_slot = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = (*next_slot).map_or(now, |slot| slot.max(now));
            *next_slot = Some(slot + self.policy.min_delay);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for RateLimitedGeocoder<G> {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError> {
        let mut attempt = 0;

        loop {
            self.pace().await;

            match self.inner.geocode(query).await {
                Ok(point) => return Ok(point),
                Err(e) if attempt < self.policy.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    let wait = self.policy.wait_for(&e);
                    log::warn!(
                        "  geocoder error for \"{query}\": {e} (retry {attempt}/{} in {wait:?})",
                        self.policy.max_retries
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Returns `true` if the failure is likely transient and worth retrying.
const fn is_retryable(e: &GeocodeError) -> bool {
    match e {
        GeocodeError::Http(_) | GeocodeError::RateLimited => true,
        GeocodeError::Status { status } => *status >= 500,
        GeocodeError::Parse { .. } | GeocodeError::Config { .. } => false,
    }
}
