//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod health;

use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;

use survey_core::domain::RateLimitScope;

use crate::middleware::error::{AppError, AppResult};
use crate::middleware::rate_limit::RateLimit;

/// Configure extractor error handling and all application routes.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .configure(configure_routes);
}

/// Configure all application routes.
///
/// Every response under `/api` passes through a rate limiter; routes without
/// a dedicated scope, unknown paths included, count against `api_standard`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/health")
                    .wrap(RateLimit::new(RateLimitScope::ApiStandard))
                    .route(web::get().to(health::health_check))
                    .default_service(web::to(method_not_allowed)),
            )
            // Auth routes
            .service(
                web::resource("/auth/login")
                    .wrap(RateLimit::new(RateLimitScope::AuthLogin))
                    .route(web::post().to(auth::login))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/auth/me")
                    .wrap(RateLimit::new(RateLimitScope::ApiStandard))
                    .route(web::get().to(auth::me))
                    .default_service(web::to(method_not_allowed)),
            )
            // Admin routes
            .service(
                web::scope("/admin")
                    .wrap(RateLimit::new(RateLimitScope::AdminStandard))
                    .service(
                        web::resource("/rate-limits")
                            .route(web::get().to(admin::list_rate_limits))
                            .default_service(web::to(method_not_allowed)),
                    )
                    .service(
                        web::resource("/rate-limits/{scope}")
                            .route(web::get().to(admin::show_rate_limit))
                            .default_service(web::to(method_not_allowed)),
                    )
                    .default_service(web::to(not_found)),
            )
            // Unknown API paths
            .service(
                web::resource("/{tail:.*}")
                    .wrap(RateLimit::new(RateLimitScope::ApiStandard))
                    .to(not_found),
            ),
    );
}

/// Fallback for unknown routes.
pub async fn not_found(req: HttpRequest) -> AppResult<HttpResponse> {
    Err(AppError::NotFound(format!(
        "The route {} could not be found.",
        req.path()
    )))
}

async fn method_not_allowed() -> AppResult<HttpResponse> {
    Err(AppError::MethodNotAllowed)
}

fn invalid_input(field: &str, detail: String) -> actix_web::Error {
    let mut errors = serde_json::Map::new();
    errors.insert(field.to_string(), json!([detail]));
    AppError::validation_with("The given data was invalid.", errors.into()).into()
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| invalid_input("body", err.to_string()))
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| invalid_input("query", err.to_string()))
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| invalid_input("path", err.to_string()))
}
