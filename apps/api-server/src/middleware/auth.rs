//! Authentication extractor.

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header, web};
use std::future::{Ready, ready};

use survey_core::domain::Principal;
use survey_core::ports::{AuthError, TokenClaims, TokenService};

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Authenticated caller.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.principal)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub principal: Principal,
    pub email: String,
}

impl Identity {
    /// Fails with `forbidden` unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.principal.is_admin() {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions.into())
        }
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            principal: claims.principal,
            email: claims.email,
        }
    }
}

/// Decode the `Authorization: Bearer <token>` header, if any.
pub fn authenticate(
    headers: &header::HeaderMap,
    tokens: &dyn TokenService,
) -> Result<Identity, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))?;

    tokens.validate_token(token.trim()).map(Identity::from)
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Already resolved by the rate limit middleware
        if let Some(identity) = req.extensions().get::<Identity>() {
            return ready(Ok(identity.clone()));
        }

        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Err(AppError::internal("Application state is not configured")));
        };

        ready(authenticate(req.headers(), state.tokens.as_ref()).map_err(AppError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use survey_core::domain::PrincipalKind;
    use survey_shared::ErrorKind;

    use crate::state::test_support::test_state;

    #[test]
    fn test_authenticate_bearer_token() {
        let state = test_state();
        let principal = Principal::new(PrincipalKind::EndUser, "42");
        let token = state
            .tokens
            .generate_token(&principal, "user@example.com")
            .unwrap();

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();

        let identity = authenticate(req.headers(), state.tokens.as_ref()).unwrap();
        assert_eq!(identity.principal, principal);
        assert_eq!(identity.email, "user@example.com");
    }

    #[test]
    fn test_authenticate_rejects_missing_and_malformed_headers() {
        let state = test_state();

        let missing = TestRequest::default().to_http_request();
        assert!(matches!(
            authenticate(missing.headers(), state.tokens.as_ref()),
            Err(AuthError::MissingAuth)
        ));

        let basic = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert!(matches!(
            authenticate(basic.headers(), state.tokens.as_ref()),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_require_admin() {
        let admin = Identity {
            principal: Principal::new(PrincipalKind::Admin, "1"),
            email: "admin@example.com".into(),
        };
        assert!(admin.require_admin().is_ok());

        let social = Identity {
            principal: Principal::new(PrincipalKind::SocialUser, "7"),
            email: "social@example.com".into(),
        };
        let err = social.require_admin().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
