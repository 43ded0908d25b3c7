//! Administrative endpoints.

use actix_web::{HttpResponse, web};
use serde_json::json;

use survey_core::domain::{RateLimitPolicy, RateLimitScope};
use survey_shared::dto::{PageQuery, RateLimitPolicyResponse};
use survey_shared::{ApiResponse, PaginatedResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn policy_response(scope: RateLimitScope, policy: RateLimitPolicy) -> RateLimitPolicyResponse {
    RateLimitPolicyResponse {
        scope: scope.as_str().to_string(),
        max_attempts: policy.max_attempts(),
        window_seconds: policy.window_secs(),
    }
}

fn validate_page(query: &PageQuery) -> AppResult<()> {
    let mut errors = serde_json::Map::new();
    if query.page < 1 {
        errors.insert("page".into(), json!(["The page must be at least 1."]));
    }
    if query.per_page < 1 || query.per_page > PageQuery::MAX_PER_PAGE {
        errors.insert(
            "per_page".into(),
            json!([format!(
                "The per page must be between 1 and {}.",
                PageQuery::MAX_PER_PAGE
            )]),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation_with(
            "The given data was invalid.",
            errors.into(),
        ))
    }
}

/// GET /api/admin/rate-limits?page=&per_page=
///
/// The effective policy table, one row per scope.
pub async fn list_rate_limits(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    identity.require_admin()?;
    let query = query.into_inner();
    validate_page(&query)?;

    let rows: Vec<RateLimitPolicyResponse> = state
        .policies
        .iter()
        .map(|(scope, policy)| policy_response(scope, policy))
        .collect();
    let total = rows.len() as u64;

    let offset = usize::try_from((query.page - 1).saturating_mul(query.per_page))
        .unwrap_or(usize::MAX);
    let items: Vec<_> = rows
        .into_iter()
        .skip(offset)
        .take(query.per_page as usize)
        .collect();

    Ok(HttpResponse::Ok().json(PaginatedResponse::new(
        items,
        query.page,
        query.per_page,
        total,
        "Rate limit policies",
    )))
}

/// GET /api/admin/rate-limits/{scope}
pub async fn show_rate_limit(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    identity.require_admin()?;

    let scope: RateLimitScope = path.into_inner().parse()?;
    let policy = state.policies.get(scope);

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        policy_response(scope, policy),
        "Rate limit policy",
    )))
}
