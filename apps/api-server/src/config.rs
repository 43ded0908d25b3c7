//! Application configuration loaded from environment variables.

use std::env;
use std::net::IpAddr;

use survey_core::domain::{RateLimitPolicies, RateLimitPolicy, RateLimitScope};
use survey_core::FailureMode;
use survey_infra::JwtConfig;

#[cfg(feature = "redis")]
use survey_infra::RedisConfig;

/// Credentials of the admin account created at startup.
#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Include exception details in internal error responses.
    pub debug: bool,
    pub rate_limits: RateLimitPolicies,
    pub failure_mode: FailureMode,
    /// Peers whose `Forwarded` / `X-Forwarded-For` headers name the client.
    pub trusted_proxies: Vec<IpAddr>,
    /// Shared counter store; `None` keeps counters in process memory.
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub seed_admin: Option<SeedAdmin>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "production".to_string());
        let debug = env::var("APP_DEBUG")
            .map(|v| v == "true" || v == "1")
            .unwrap_or_else(|_| !Self::is_production(&app_env));

        let failure_mode = if env::var("RATE_LIMIT_FAIL_OPEN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
        {
            FailureMode::Open
        } else {
            FailureMode::Closed
        };

        let seed_admin = match (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(SeedAdmin { email, password }),
            _ => None,
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            debug,
            rate_limits: Self::parse_rate_limits(|name| env::var(name).ok()),
            failure_mode,
            trusted_proxies: env::var("TRUSTED_PROXIES")
                .map(|v| Self::parse_trusted_proxies(&v))
                .unwrap_or_default(),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
            jwt: JwtConfig::from_env(),
            seed_admin,
        }
    }

    fn is_production(app_env: &str) -> bool {
        matches!(app_env, "production" | "prod")
    }

    /// Comma-separated IP addresses; invalid entries are skipped.
    fn parse_trusted_proxies(value: &str) -> Vec<IpAddr> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match entry.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(e) => {
                    tracing::warn!(entry = %entry, error = %e, "Ignoring invalid trusted proxy");
                    None
                }
            })
            .collect()
    }

    /// Parse per-scope overrides.
    /// Format: RATE_LIMIT_<SCOPE>=<max_attempts>/<window_secs>
    /// Example: RATE_LIMIT_EXPORT=20/600
    fn parse_rate_limits(lookup: impl Fn(&str) -> Option<String>) -> RateLimitPolicies {
        let mut policies = RateLimitPolicies::new();

        for scope in RateLimitScope::ALL {
            let name = scope.env_var();
            let Some(value) = lookup(&name) else {
                continue;
            };

            match value.parse::<RateLimitPolicy>() {
                Ok(policy) => {
                    tracing::info!(scope = %scope, policy = %policy, "Rate limit override");
                    policies = policies.with_override(scope, policy);
                }
                Err(e) => {
                    tracing::warn!(variable = %name, error = %e, "Ignoring invalid rate limit override");
                }
            }
        }

        policies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_rate_limit_overrides() {
        let policies = AppConfig::parse_rate_limits(lookup(&[
            ("RATE_LIMIT_EXPORT", "20/600"),
            ("RATE_LIMIT_IMPORT", "garbage"),
        ]));

        let export = policies.get(RateLimitScope::Export);
        assert_eq!(export.max_attempts(), 20);
        assert_eq!(export.window(), Duration::from_secs(600));

        assert_eq!(
            policies.get(RateLimitScope::Import),
            RateLimitScope::Import.default_policy()
        );
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let policies = AppConfig::parse_rate_limits(lookup(&[]));

        for (scope, policy) in policies.iter() {
            assert_eq!(policy, scope.default_policy());
        }
    }

    #[test]
    fn test_trusted_proxies_parsing() {
        let proxies = AppConfig::parse_trusted_proxies(" 10.0.0.1, ::1,not-an-ip,, ");
        assert_eq!(
            proxies,
            vec![
                "10.0.0.1".parse::<IpAddr>().unwrap(),
                "::1".parse::<IpAddr>().unwrap()
            ]
        );
        assert!(AppConfig::parse_trusted_proxies("").is_empty());
    }

    #[test]
    fn test_production_detection() {
        assert!(AppConfig::is_production("production"));
        assert!(AppConfig::is_production("prod"));
        assert!(!AppConfig::is_production("local"));
    }
}
