//! # Survey Infrastructure
//!
//! Concrete implementations of the ports defined in `survey-core`:
//! counter stores for rate limiting, clocks, authentication and user storage.
//!
//! ## Feature Flags
//!
//! - `redis` (default) - Redis-backed counter store

pub mod auth;
pub mod clock;
pub mod counter;
pub mod users;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use clock::{ManualClock, SystemClock};
pub use counter::InMemoryCounterStore;
pub use users::InMemoryUserRepository;

#[cfg(feature = "redis")]
pub use counter::{RedisConfig, RedisCounterStore};
