//! Rate limiting port.

use async_trait::async_trait;

use crate::domain::{RateLimitDecision, RateLimitKey, RateLimitPolicy};

/// Rate limiter trait - answers "may this request run now?".
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check `key` against `policy` and consume one attempt if allowed.
    ///
    /// Being over budget is a regular `allowed = false` decision, not an error.
    async fn check(&self, key: &RateLimitKey, policy: &RateLimitPolicy) -> RateLimitDecision;
}
