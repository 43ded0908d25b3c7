//! Application state - shared across all handlers and middleware.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use survey_core::domain::{PrincipalKind, RateLimitPolicies, User};
use survey_core::error::RepoError;
use survey_core::ports::{
    AuthError, CounterStore, CounterStoreError, PasswordService, RateLimiter, TokenService,
    UserRepository,
};
use survey_core::FixedWindowRateLimiter;
use survey_infra::{
    Argon2PasswordService, InMemoryCounterStore, InMemoryUserRepository, JwtTokenService,
};

use crate::config::{AppConfig, SeedAdmin};

/// How often expired in-memory counters are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Failures that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("counter store unavailable: {0}")]
    CounterStore(#[from] CounterStoreError),

    #[error("failed to seed admin account: {0}")]
    SeedAuth(#[from] AuthError),

    #[error("failed to seed admin account: {0}")]
    SeedRepo(#[from] RepoError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<dyn RateLimiter>,
    pub policies: Arc<RateLimitPolicies>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    /// Peers allowed to report the client address in forwarding headers.
    pub trusted_proxies: Arc<[IpAddr]>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StartupError> {
        let store = Self::counter_store(config).await?;
        let limiter = FixedWindowRateLimiter::new(store).with_failure_mode(config.failure_mode);

        let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        if let Some(seed) = &config.seed_admin {
            Self::seed_admin(users.as_ref(), passwords.as_ref(), seed).await?;
        }

        tracing::info!(
            failure_mode = ?config.failure_mode,
            "Application state initialized"
        );

        Ok(Self {
            limiter: Arc::new(limiter),
            policies: Arc::new(config.rate_limits.clone()),
            users,
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            passwords,
            trusted_proxies: config.trusted_proxies.clone().into(),
        })
    }

    #[cfg(feature = "redis")]
    async fn counter_store(config: &AppConfig) -> Result<Arc<dyn CounterStore>, StartupError> {
        use survey_infra::RedisCounterStore;

        let Some(redis) = &config.redis else {
            tracing::warn!("REDIS_URL not set. Rate limit counters are per-process (in-memory mode).");
            return Ok(Self::in_memory_store());
        };

        match RedisCounterStore::new(redis.clone()).await {
            Ok(store) => Ok(Arc::new(store)),
            Err(e) if redis.fallback_to_memory => {
                tracing::error!(
                    "Failed to connect to Redis: {}. Using in-memory counter store.",
                    e
                );
                Ok(Self::in_memory_store())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn counter_store(_config: &AppConfig) -> Result<Arc<dyn CounterStore>, StartupError> {
        tracing::info!("Running without redis feature - using in-memory counter store");
        Ok(Self::in_memory_store())
    }

    /// In-memory store plus a background task that drops expired counters.
    fn in_memory_store() -> Arc<dyn CounterStore> {
        let store = Arc::new(InMemoryCounterStore::new());

        let purger = Arc::clone(&store);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                let purged = purger.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired rate limit counters");
                }
            }
        });

        store
    }

    async fn seed_admin(
        users: &dyn UserRepository,
        passwords: &dyn PasswordService,
        seed: &SeedAdmin,
    ) -> Result<(), StartupError> {
        if users.find_by_email(&seed.email).await?.is_some() {
            return Ok(());
        }

        let hash = passwords.hash(&seed.password)?;
        let admin = users
            .insert(User::new(seed.email.clone(), hash, PrincipalKind::Admin))
            .await?;

        tracing::info!(email = %admin.email, "Seeded admin account");
        Ok(())
    }
}
