//! Error handling - every failure renders the standard response envelope.

use std::panic::Location;
use std::sync::OnceLock;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use survey_core::DomainError;
use survey_core::domain::{RateLimitDecision, RateLimitPolicy};
use survey_core::error::RepoError;
use survey_core::ports::AuthError;
use survey_shared::{ApiResponse, ErrorKind};

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Application-level error type, one variant per [`ErrorKind`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: Option<Value>,
    },

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded: {policy}")]
    RateLimited {
        decision: RateLimitDecision,
        policy: RateLimitPolicy,
    },

    #[error("Internal error: {detail}")]
    Internal {
        detail: String,
        location: &'static Location<'static>,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors: None,
        }
    }

    /// Validation failure with per-field messages, e.g. `{"email": ["..."]}`.
    pub fn validation_with(message: impl Into<String>, errors: Value) -> Self {
        AppError::Validation {
            message: message.into(),
            errors: Some(errors),
        }
    }

    /// Unexpected failure, remembering where it was raised.
    #[track_caller]
    pub fn internal(detail: impl Into<String>) -> Self {
        AppError::Internal {
            detail: detail.into(),
            location: Location::caller(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::MethodNotAllowed => ErrorKind::MethodNotAllowed,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::RateLimited { .. } => ErrorKind::RateLimited,
            AppError::Internal { .. } => ErrorKind::Internal,
        }
    }
}

/// Turns an [`AppError`] into the response envelope.
///
/// With `expose_details` off (production), internal failures carry only the
/// generic message. With it on, `errors` adds the exception text and the
/// file/line it was raised from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorRenderer {
    pub expose_details: bool,
}

static RENDERER: OnceLock<ErrorRenderer> = OnceLock::new();

impl ErrorRenderer {
    /// Make this renderer the one used by `ResponseError`. First call wins.
    pub fn install(self) {
        if RENDERER.set(self).is_err() {
            tracing::warn!("Error renderer already installed");
        }
    }

    pub fn current() -> Self {
        RENDERER.get().copied().unwrap_or_default()
    }

    /// Envelope body for `error`, stamped at `at`.
    pub fn body(&self, error: &AppError, at: DateTime<Utc>) -> ApiResponse {
        let kind = error.kind();

        let (message, errors) = match error {
            AppError::Validation { message, errors } => (message.clone(), errors.clone()),
            AppError::Unauthenticated(message)
            | AppError::Forbidden(message)
            | AppError::NotFound(message)
            | AppError::Conflict(message) => (message.clone(), None),
            AppError::MethodNotAllowed => (kind.default_message().to_string(), None),
            AppError::RateLimited { decision, policy } => (
                kind.default_message().to_string(),
                Some(json!({
                    "rate_limit": policy.to_string(),
                    "retry_after": decision.retry_after_seconds.unwrap_or(policy.window_secs()),
                })),
            ),
            AppError::Internal { detail, location } => {
                let errors = self.expose_details.then(|| {
                    json!({
                        "exception": detail,
                        "file": location.file(),
                        "line": location.line(),
                    })
                });
                (kind.default_message().to_string(), errors)
            }
        };

        ApiResponse::error_at(message, errors, at)
    }

    pub fn render(&self, error: &AppError) -> HttpResponse {
        if let AppError::Internal { detail, location } = error {
            tracing::error!(
                file = location.file(),
                line = location.line(),
                "Internal error: {}",
                detail
            );
        }

        let mut builder = HttpResponse::build(error.status_code());

        if let AppError::RateLimited { decision, policy } = error {
            let retry_after = decision
                .retry_after_seconds
                .unwrap_or(policy.window_secs());
            builder
                .insert_header((HEADER_LIMIT, decision.limit.to_string()))
                .insert_header((HEADER_REMAINING, "0"))
                .insert_header((HEADER_RETRY_AFTER, retry_after.to_string()));
        }

        builder.json(self.body(error, Utc::now()))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        ErrorRenderer::current().render(self)
    }
}

// Conversion from domain errors
impl From<DomainError> for AppError {
    #[track_caller]
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, id } => {
                AppError::NotFound(format!("{} `{}` not found", entity_type, id))
            }
            DomainError::Validation(msg) => AppError::validation(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
        }
    }
}

impl From<RepoError> for AppError {
    #[track_caller]
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Constraint(msg) => AppError::Conflict(msg),
            RepoError::Backend(msg) => AppError::internal(format!("Repository error: {}", msg)),
        }
    }
}

impl From<AuthError> for AppError {
    #[track_caller]
    fn from(err: AuthError) -> Self {
        match err.kind() {
            ErrorKind::Unauthenticated => AppError::Unauthenticated(err.to_string()),
            ErrorKind::Forbidden => AppError::Forbidden(err.to_string()),
            _ => AppError::internal(err.to_string()),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_every_kind_has_fixed_status() {
        let errors = [
            AppError::validation("bad"),
            AppError::Unauthenticated("who".into()),
            AppError::Forbidden("no".into()),
            AppError::NotFound("gone".into()),
            AppError::MethodNotAllowed,
            AppError::Conflict("dup".into()),
            AppError::RateLimited {
                decision: RateLimitDecision::blocked(5, 30),
                policy: RateLimitPolicy::new(5, std::time::Duration::from_secs(60)).unwrap(),
            },
            AppError::internal("boom"),
        ];

        let codes: Vec<u16> = errors.iter().map(|e| e.status_code().as_u16()).collect();
        assert_eq!(codes, vec![422, 401, 403, 404, 405, 409, 429, 500]);
    }

    #[test]
    fn test_validation_body() {
        let error = AppError::validation_with("bad", json!({"field": ["msg"]}));
        let body = serde_json::to_value(ErrorRenderer::default().body(&error, at())).unwrap();

        assert_eq!(
            body,
            json!({
                "success": false,
                "message": "bad",
                "data": null,
                "errors": {"field": ["msg"]},
                "timestamp": "2026-10-19T09:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_internal_error_hides_details_in_production() {
        let error = AppError::internal("connection pool exhausted");
        let body = ErrorRenderer {
            expose_details: false,
        }
        .body(&error, at());

        assert_eq!(body.message, "Internal server error");
        assert!(body.errors.is_none());
        let text = serde_json::to_string(&body).unwrap();
        assert!(!text.contains("connection pool"));
    }

    #[test]
    fn test_internal_error_reports_location_in_debug() {
        let line = line!() + 1;
        let error = AppError::internal("connection pool exhausted");
        let body = ErrorRenderer {
            expose_details: true,
        }
        .body(&error, at());

        let errors = body.errors.unwrap();
        assert_eq!(errors["exception"], "connection pool exhausted");
        assert_eq!(errors["line"], line);
        assert!(errors["file"].as_str().unwrap().ends_with("error.rs"));
        assert_eq!(body.message, "Internal server error");
    }

    #[actix_web::test]
    async fn test_rate_limited_response_shape() {
        let error = AppError::RateLimited {
            decision: RateLimitDecision::blocked(5, 42),
            policy: RateLimitPolicy::new(5, std::time::Duration::from_secs(60)).unwrap(),
        };

        let response = ErrorRenderer::default().render(&error);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(HEADER_RETRY_AFTER).unwrap(), "42");
        assert_eq!(response.headers().get(HEADER_REMAINING).unwrap(), "0");
        assert_eq!(response.headers().get(HEADER_LIMIT).unwrap(), "5");

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], "Too many requests. Please try again later.");
        assert_eq!(body["errors"]["retry_after"], json!(42));
        assert_eq!(body["errors"]["rate_limit"], "5 requests per 60 seconds");
    }

    #[test]
    fn test_domain_conversions() {
        let not_found: AppError = DomainError::NotFound {
            entity_type: "rate limit scope",
            id: "uploads".into(),
        }
        .into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let conflict: AppError = RepoError::Constraint("email taken".into()).into();
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let expired: AppError = AuthError::TokenExpired.into();
        assert_eq!(expired.kind(), ErrorKind::Unauthenticated);

        let hashing: AppError = AuthError::HashingError("salt".into()).into();
        assert_eq!(hashing.kind(), ErrorKind::Internal);
    }
}
