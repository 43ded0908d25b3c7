use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Injected wherever expiry or timestamps are computed so tests can drive
/// time explicitly instead of sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
