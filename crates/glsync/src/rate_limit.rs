//! Request pacing for the GitLab API.
//!
//! One limiter is constructed per credential: different users' tokens are
//! throttled independently by the upstream platform, so sharing a limiter
//! across users would only serialize unrelated work.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default requests per second for one credential.
pub const DEFAULT_RPS: u32 = 10;

/// Token-bucket limiter enforcing a minimum spacing between consecutive
/// API requests made with one credential.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter allowing `rps` requests per second.
    ///
    /// A zero `rps` is clamped to one request per second.
    #[must_use]
    pub fn new(rps: u32) -> Self {
        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::new(1).expect("1 is non-zero"));
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Wait until the next request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}
