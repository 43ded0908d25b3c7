//! In-memory counter store - used as fallback when Redis is unavailable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use survey_core::ports::{Clock, CounterStore, CounterStoreError};

use crate::clock::SystemClock;

struct CounterEntry {
    value: u64,
    expires_at: DateTime<Utc>,
}

impl CounterEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Expiring counters in a single `HashMap` behind an async mutex.
///
/// Every operation takes the same lock, which makes `increment` atomic per
/// key. Note: counters are per-process, not shared across instances, and are
/// lost on restart.
pub struct InMemoryCounterStore {
    entries: Mutex<HashMap<String, CounterEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Drop expired counters, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of counters held, live or not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, CounterStoreError> {
        let ttl = TimeDelta::from_std(ttl).map_err(|e| CounterStoreError::Operation(e.to_string()))?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.value += 1;
                Ok(entry.value)
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    CounterEntry {
                        value: 1,
                        expires_at: now + ttl,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value)),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn time_to_live(&self, key: &str) -> Result<Duration, CounterStoreError> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;

        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| (entry.expires_at - now).to_std().ok())
            .unwrap_or(Duration::ZERO))
    }
}
