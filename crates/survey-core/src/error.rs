//! Domain-level error types.

use survey_shared::ErrorKind;
use thiserror::Error;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Storage backend failed: {0}")]
    Backend(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::Backend(_) => ErrorKind::Internal,
            RepoError::NotFound => ErrorKind::NotFound,
            RepoError::Constraint(_) => ErrorKind::Conflict,
        }
    }
}
