//! Domain entities - the core business objects.

mod rate_limit;
mod user;

pub use rate_limit::{
    RateLimitDecision, RateLimitIdentity, RateLimitKey, RateLimitPolicies, RateLimitPolicy,
    RateLimitScope,
};
pub use user::{Principal, PrincipalKind, User};
