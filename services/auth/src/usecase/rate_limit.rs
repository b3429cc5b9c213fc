use std::sync::Arc;

use tracing::{debug, warn};

use digiinsta_core::clock::Clock;

use crate::domain::repository::RateLimitStore;
use crate::domain::types::{RateLimitDecision, RateLimitPolicy};

/// Sliding-window throttle over a shared store.
///
/// Fails open: with no store configured, or when the store errors, every
/// request is let through and the failure is logged.
#[derive(Clone)]
pub struct RateLimiter {
    store: Option<Arc<dyn RateLimitStore>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Option<Arc<dyn RateLimitStore>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// A limiter that admits everything.
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self::new(None, clock)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn check(&self, policy: &RateLimitPolicy, identifier: &str) -> RateLimitDecision {
        let Some(store) = &self.store else {
            return RateLimitDecision::Bypassed;
        };

        let now_ms = self.clock.now().timestamp_millis();
        let window_ms = policy.window_ms();
        let key = policy.bucket_key(identifier);

        let hit = match store.hit(&key, now_ms, window_ms, policy.limit).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, policy = policy.name, "rate limit store unavailable, allowing request");
                return RateLimitDecision::Bypassed;
            }
        };

        if hit.count > u64::from(policy.limit) {
            let oldest = hit.oldest_ms.unwrap_or(now_ms);
            let reset_in_ms = (oldest + window_ms - now_ms).max(0);
            // Round up; never tell a client to retry in 0 seconds.
            let retry_after_secs = u64::try_from((reset_in_ms + 999) / 1000).unwrap_or(0).max(1);
            debug!(policy = policy.name, identifier, retry_after_secs, "rate limited");
            return RateLimitDecision::Blocked {
                limit: policy.limit,
                retry_after_secs,
            };
        }

        let remaining = u64::from(policy.limit).saturating_sub(hit.count);
        RateLimitDecision::Allowed {
            limit: policy.limit,
            remaining: u32::try_from(remaining).unwrap_or(u32::MAX),
        }
    }
}
