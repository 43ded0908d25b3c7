//! Redis counter store - shared fixed-window counters.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use survey_core::ports::{CounterStore, CounterStoreError};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whether to fall back to the in-memory store if Redis is unavailable
    pub fallback_to_memory: bool,
    /// Namespace for every counter key
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: true,
            key_prefix: "ratelimit".to_string(),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
        }
    }
}

/// Redis-backed counter store.
///
/// Increments run as a Lua script so the `INCR` and the first `PEXPIRE`
/// are applied atomically.
pub struct RedisCounterStore {
    conn: ConnectionManager,
    key_prefix: String,
    increment_script: Script,
}

impl RedisCounterStore {
    pub async fn new(config: RedisConfig) -> Result<Self, CounterStoreError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CounterStoreError::Connection(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CounterStoreError::Connection("Connection timed out".to_string()))?
            .map_err(|e| CounterStoreError::Connection(e.to_string()))?;

        // Returns the counter value after the increment
        let increment_script = Script::new(
            r#"
            local current = redis.call('INCR', KEYS[1])
            if current == 1 then
                redis.call('PEXPIRE', KEYS[1], ARGV[1])
            end
            return current
            "#,
        );

        tracing::info!(url = %config.url, "Connected to Redis counter store");

        Ok(Self {
            conn,
            key_prefix: config.key_prefix,
            increment_script,
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, CounterStoreError> {
        Self::new(RedisConfig::from_env()).await
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, CounterStoreError> {
        let mut conn = self.conn.clone();
        let ttl_ms = ttl.as_millis().max(1) as u64;

        self.increment_script
            .key(self.make_key(key))
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CounterStoreError::Operation(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError> {
        let mut conn = self.conn.clone();

        conn.get::<_, Option<u64>>(self.make_key(key))
            .await
            .map_err(|e| CounterStoreError::Operation(e.to_string()))
    }

    async fn time_to_live(&self, key: &str) -> Result<Duration, CounterStoreError> {
        let mut conn = self.conn.clone();

        // PTTL answers -2 for a missing key and -1 for a key without expiry.
        let ttl_ms: i64 = conn
            .pttl(self.make_key(key))
            .await
            .map_err(|e| CounterStoreError::Operation(e.to_string()))?;

        Ok(u64::try_from(ttl_ms)
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO))
    }
}
