//! Counter store port - shared expiring counters.

use std::time::Duration;

use async_trait::async_trait;

/// Shared key-value store of expiring integer counters.
///
/// All rate limit state lives behind this trait so that every worker and
/// process observes one budget. Implementations must make [`increment`]
/// atomic per key.
///
/// [`increment`]: CounterStore::increment
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `key` and return the new value.
    ///
    /// A missing or expired counter starts at 1 and expires after `ttl`.
    /// Incrementing a live counter never changes its expiry.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, CounterStoreError>;

    /// Current value of a live counter, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError>;

    /// Time left before `key` expires, zero if absent or expired.
    async fn time_to_live(&self, key: &str) -> Result<Duration, CounterStoreError>;
}

/// Counter store errors.
#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
