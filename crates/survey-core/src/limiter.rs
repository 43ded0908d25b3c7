//! Fixed-window rate limiter over a shared [`CounterStore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{RateLimitDecision, RateLimitKey, RateLimitPolicy};
use crate::ports::{CounterStore, CounterStoreError, RateLimiter};

/// What to answer when the counter store cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Reject the request and ask the caller to retry after a full window.
    #[default]
    Closed,
    /// Let the request through without counting it.
    Open,
}

/// Counts attempts per key in fixed windows.
///
/// The limiter keeps no counters of its own: every read and write goes
/// through the store, whose atomic increment is the only synchronization
/// between concurrent callers of the same key.
pub struct FixedWindowRateLimiter {
    store: Arc<dyn CounterStore>,
    failure_mode: FailureMode,
}

impl FixedWindowRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            failure_mode: FailureMode::default(),
        }
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    pub fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    async fn evaluate(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, CounterStoreError> {
        let max_attempts = u64::from(policy.max_attempts());

        // Over budget: answer without touching the counter so the rejection
        // neither consumes budget nor extends the window.
        let current = self.store.get(key).await?.unwrap_or(0);
        if current >= max_attempts {
            return self.blocked(key, policy).await;
        }

        let attempts = self.store.increment(key, policy.window()).await?;
        if attempts > max_attempts {
            // Lost the race for the last slot to a concurrent caller.
            return self.blocked(key, policy).await;
        }

        let remaining = max_attempts.saturating_sub(attempts) as u32;
        Ok(RateLimitDecision::allowed(policy.max_attempts(), remaining))
    }

    async fn blocked(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, CounterStoreError> {
        let ttl = self.store.time_to_live(key).await?;
        Ok(RateLimitDecision::blocked(
            policy.max_attempts(),
            retry_after_secs(ttl, policy.window()),
        ))
    }

    fn on_store_failure(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
        error: CounterStoreError,
    ) -> RateLimitDecision {
        tracing::error!(
            scope = %key.scope(),
            identity = %key.identity(),
            error = %error,
            failure_mode = ?self.failure_mode,
            "Rate limit counter store unavailable"
        );

        match self.failure_mode {
            FailureMode::Closed => {
                RateLimitDecision::blocked(policy.max_attempts(), policy.window_secs())
            }
            FailureMode::Open => {
                RateLimitDecision::allowed(policy.max_attempts(), policy.max_attempts())
            }
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn check(&self, key: &RateLimitKey, policy: &RateLimitPolicy) -> RateLimitDecision {
        let storage_key = key.storage_key();

        match self.evaluate(&storage_key, policy).await {
            Ok(decision) => {
                if !decision.allowed {
                    tracing::debug!(
                        key = %storage_key,
                        retry_after = ?decision.retry_after_seconds,
                        "Rate limit exhausted"
                    );
                }
                decision
            }
            Err(error) => self.on_store_failure(key, policy, error),
        }
    }
}

/// Whole seconds until the window resets, rounded up and kept within
/// `1..=window`.
fn retry_after_secs(ttl: Duration, window: Duration) -> u64 {
    let mut secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs += 1;
    }
    secs.clamp(1, window.as_secs().max(1))
}
