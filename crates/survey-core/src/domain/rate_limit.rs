//! Rate limit scopes, budgets, keys and decisions.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::user::Principal;
use crate::error::DomainError;

/// A named category of rate-limited operation, each with its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    AuthLogin,
    ApiStandard,
    AdminStandard,
    Export,
    Import,
    BroadcastingAuth,
    SurveyResponseSubmit,
}

impl RateLimitScope {
    pub const ALL: [RateLimitScope; 7] = [
        RateLimitScope::AuthLogin,
        RateLimitScope::ApiStandard,
        RateLimitScope::AdminStandard,
        RateLimitScope::Export,
        RateLimitScope::Import,
        RateLimitScope::BroadcastingAuth,
        RateLimitScope::SurveyResponseSubmit,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RateLimitScope::AuthLogin => "auth_login",
            RateLimitScope::ApiStandard => "api_standard",
            RateLimitScope::AdminStandard => "admin_standard",
            RateLimitScope::Export => "export",
            RateLimitScope::Import => "import",
            RateLimitScope::BroadcastingAuth => "broadcasting_auth",
            RateLimitScope::SurveyResponseSubmit => "survey_response_submit",
        }
    }

    /// Budget applied when configuration does not override the scope.
    pub const fn default_policy(self) -> RateLimitPolicy {
        match self {
            RateLimitScope::AuthLogin => RateLimitPolicy::per_window(5, 60),
            RateLimitScope::ApiStandard => RateLimitPolicy::per_window(60, 60),
            RateLimitScope::AdminStandard => RateLimitPolicy::per_window(120, 60),
            RateLimitScope::Export => RateLimitPolicy::per_window(10, 300),
            RateLimitScope::Import => RateLimitPolicy::per_window(5, 300),
            RateLimitScope::BroadcastingAuth => RateLimitPolicy::per_window(60, 60),
            RateLimitScope::SurveyResponseSubmit => RateLimitPolicy::per_window(30, 60),
        }
    }

    /// Name of the environment variable that overrides this scope's budget.
    pub fn env_var(self) -> String {
        format!("RATE_LIMIT_{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateLimitScope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RateLimitScope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| DomainError::NotFound {
                entity_type: "rate limit scope",
                id: s.to_string(),
            })
    }
}

/// Budget of one scope: at most `max_attempts` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_attempts: u32,
    window: Duration,
}

impl RateLimitPolicy {
    const fn per_window(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Build a policy, rejecting empty budgets and windows that are not a
    /// whole number of seconds.
    pub fn new(max_attempts: u32, window: Duration) -> Result<Self, DomainError> {
        if max_attempts == 0 {
            return Err(DomainError::Validation(
                "max attempts must be at least 1".to_string(),
            ));
        }
        if window.as_secs() == 0 {
            return Err(DomainError::Validation(
                "window must be at least one second".to_string(),
            ));
        }
        if window.subsec_nanos() != 0 {
            return Err(DomainError::Validation(
                "window must be a whole number of seconds".to_string(),
            ));
        }
        Ok(Self::per_window(max_attempts, window.as_secs()))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

impl fmt::Display for RateLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests per {} seconds",
            self.max_attempts,
            self.window_secs()
        )
    }
}

/// Parses `"<max_attempts>/<window_secs>"`, e.g. `"10/300"`.
impl FromStr for RateLimitPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::Validation(format!("expected `<max>/<seconds>`, got `{s}`"));

        let (max, window) = s.trim().split_once('/').ok_or_else(invalid)?;
        let max: u32 = max.trim().parse().map_err(|_| invalid())?;
        let window: u64 = window.trim().parse().map_err(|_| invalid())?;

        Self::new(max, Duration::from_secs(window))
    }
}

/// Policy table keyed by scope. Scopes without an entry use their default.
#[derive(Debug, Clone, Default)]
pub struct RateLimitPolicies {
    overrides: HashMap<RateLimitScope, RateLimitPolicy>,
}

impl RateLimitPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, scope: RateLimitScope, policy: RateLimitPolicy) -> Self {
        self.overrides.insert(scope, policy);
        self
    }

    pub fn get(&self, scope: RateLimitScope) -> RateLimitPolicy {
        self.overrides
            .get(&scope)
            .copied()
            .unwrap_or_else(|| scope.default_policy())
    }

    /// Every scope with its effective policy, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (RateLimitScope, RateLimitPolicy)> + '_ {
        RateLimitScope::ALL
            .into_iter()
            .map(move |scope| (scope, self.get(scope)))
    }
}

/// Who a budget belongs to: an authenticated principal or, for anonymous
/// callers, the source IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitIdentity {
    Principal(Principal),
    Ip(String),
}

impl RateLimitIdentity {
    /// Prefer the principal; fall back to the source IP.
    pub fn resolve(principal: Option<&Principal>, source_ip: &str) -> Self {
        match principal {
            Some(principal) => RateLimitIdentity::Principal(principal.clone()),
            None if source_ip.is_empty() => RateLimitIdentity::Ip("unknown".to_string()),
            None => RateLimitIdentity::Ip(source_ip.to_string()),
        }
    }
}

impl fmt::Display for RateLimitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitIdentity::Principal(principal) => write!(f, "{principal}"),
            RateLimitIdentity::Ip(ip) => write!(f, "ip:{ip}"),
        }
    }
}

/// Identifies one counting window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    scope: RateLimitScope,
    identity: RateLimitIdentity,
}

impl RateLimitKey {
    pub fn new(scope: RateLimitScope, identity: RateLimitIdentity) -> Self {
        Self { scope, identity }
    }

    pub fn scope(&self) -> RateLimitScope {
        self.scope
    }

    pub fn identity(&self) -> &RateLimitIdentity {
        &self.identity
    }

    /// Key used in the counter store: `"{scope}:{identity}"`.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.scope, self.identity)
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.identity)
    }
}

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets; set only when `allowed` is false.
    pub retry_after_seconds: Option<u64>,
}

impl RateLimitDecision {
    pub fn allowed(limit: u32, remaining: u32) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            retry_after_seconds: None,
        }
    }

    pub fn blocked(limit: u32, retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}
