//! # Survey Core
//!
//! The domain layer of the survey API.
//! Rate limit policies, principals and the fixed-window limiter live here,
//! with every external dependency behind a port.

pub mod domain;
pub mod error;
pub mod limiter;
pub mod ports;

pub use error::DomainError;
pub use limiter::{FailureMode, FixedWindowRateLimiter};
