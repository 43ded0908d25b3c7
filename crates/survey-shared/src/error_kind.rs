//! Closed error taxonomy shared by every API endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure category of an API response. Each kind maps to exactly one HTTP
/// status code, independent of the endpoint that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    RateLimited,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Validation,
        ErrorKind::Unauthenticated,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::MethodNotAllowed,
        ErrorKind::RateLimited,
        ErrorKind::Conflict,
        ErrorKind::Internal,
    ];

    pub const fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 422,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::RateLimited => 429,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MethodNotAllowed => "method_not_allowed",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }

    /// Message used when the caller has nothing more specific to say.
    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Validation => "The given data was invalid.",
            ErrorKind::Unauthenticated => "Unauthenticated.",
            ErrorKind::Forbidden => "This action is unauthorized.",
            ErrorKind::NotFound => "Resource not found.",
            ErrorKind::MethodNotAllowed => "Method not allowed.",
            ErrorKind::RateLimited => "Too many requests. Please try again later.",
            ErrorKind::Conflict => "The request conflicts with the current state of the resource.",
            ErrorKind::Internal => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::Validation.status_code(), 422);
        assert_eq!(ErrorKind::Unauthenticated.status_code(), 401);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::MethodNotAllowed.status_code(), 405);
        assert_eq!(ErrorKind::RateLimited.status_code(), 429);
        assert_eq!(ErrorKind::Conflict.status_code(), 409);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn test_status_codes_are_distinct() {
        let codes: HashSet<u16> = ErrorKind::ALL.iter().map(|k| k.status_code()).collect();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn test_serializes_as_snake_case() {
        let value = serde_json::to_value(ErrorKind::MethodNotAllowed).unwrap();
        assert_eq!(value, serde_json::json!("method_not_allowed"));

        for kind in ErrorKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }
}
