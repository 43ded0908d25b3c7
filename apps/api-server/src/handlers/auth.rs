//! Authentication handlers.

use actix_web::{HttpResponse, web};
use serde_json::{Map, Value, json};

use survey_shared::ApiResponse;
use survey_shared::dto::{AuthResponse, LoginRequest, PrincipalResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn validate_login(req: &LoginRequest) -> AppResult<()> {
    let mut errors = Map::new();

    let email = req.email.trim();
    if email.is_empty() {
        errors.insert("email".into(), json!(["The email field is required."]));
    } else if !email.contains('@') {
        errors.insert("email".into(), json!(["The email must be a valid email address."]));
    }

    if req.password.is_empty() {
        errors.insert("password".into(), json!(["The password field is required."]));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation_with(
            "The given data was invalid.",
            Value::Object(errors),
        ))
    }
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    validate_login(&req)?;

    let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

    let user = state
        .users
        .find_by_email(req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !state.passwords.verify(&req.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    let token = state.tokens.generate_token(&user.principal(), &user.email)?;

    let response = AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(response, "Login successful")))
}

/// GET /api/auth/me - requires authentication
pub async fn me(identity: Identity) -> AppResult<HttpResponse> {
    let response = PrincipalResponse {
        id: identity.principal.id.clone(),
        kind: identity.principal.kind.as_str().to_string(),
        email: identity.email,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(response, "Authenticated principal")))
}
