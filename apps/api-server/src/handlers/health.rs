//! Health check endpoint.

use actix_web::HttpResponse;
use serde::Serialize;

use survey_shared::ApiResponse;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint - not rate limited.
///
/// GET /api/health
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    };

    HttpResponse::Ok().json(ApiResponse::success(response, "Service is healthy"))
}
