//! Rate limiting middleware.

use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
    web,
};
use futures::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::net::{IpAddr, SocketAddr};
use std::rc::Rc;

use survey_core::domain::{RateLimitIdentity, RateLimitKey, RateLimitScope};

use crate::middleware::auth::{Identity, authenticate};
use crate::middleware::error::AppError;
use crate::state::AppState;

/// Rate limiting middleware factory bound to one scope.
///
/// Every request through the wrapped service consumes one attempt from the
/// budget of `(scope, identity)`, where the identity is the authenticated
/// principal when a valid Bearer token is present and the client IP otherwise.
/// The client IP is the socket peer unless that peer is a trusted proxy.
pub struct RateLimit {
    scope: RateLimitScope,
}

impl RateLimit {
    pub fn new(scope: RateLimitScope) -> Self {
        Self { scope }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            scope: self.scope,
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    scope: RateLimitScope,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let scope = self.scope;

        Box::pin(async move {
            let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
                let error = AppError::internal("Application state is not configured");
                return Ok(req.error_response(error).map_into_right_body());
            };

            // Invalid tokens fall back to the IP budget; handlers that need
            // authentication reject them on their own.
            let identity = authenticate(req.headers(), state.tokens.as_ref()).ok();
            let source_ip = client_ip(&req, &state.trusted_proxies);

            let key = RateLimitKey::new(
                scope,
                RateLimitIdentity::resolve(identity.as_ref().map(|i| &i.principal), &source_ip),
            );
            let policy = state.policies.get(scope);
            let decision = state.limiter.check(&key, &policy).await;

            if !decision.allowed {
                tracing::warn!(
                    scope = %scope,
                    identity = %key.identity(),
                    retry_after = ?decision.retry_after_seconds,
                    "Rate limit exceeded"
                );
                let error = AppError::RateLimited { decision, policy };
                return Ok(req.error_response(error).map_into_right_body());
            }

            if let Some(identity) = identity {
                req.extensions_mut().insert::<Identity>(identity);
            }
            req.extensions_mut().insert(decision);

            let http_req = req.request().clone();
            let mut res = match service.call(req).await {
                Ok(res) => res.map_into_left_body(),
                Err(err) => ServiceResponse::from_err(err, http_req).map_into_right_body(),
            };

            let headers = res.headers_mut();
            headers.insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(decision.limit),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(decision.remaining),
            );

            Ok(res)
        })
    }
}

/// Address the budget of an anonymous caller is keyed on.
///
/// Forwarding headers are honored only when the socket peer is listed in
/// `trusted_proxies`; otherwise any client could pick its own key.
fn client_ip(req: &ServiceRequest, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = req.peer_addr().map(|addr| addr.ip()) else {
        return String::new();
    };
    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let info = req.connection_info();
    let forwarded = info.realip_remote_addr().unwrap_or_default();
    forwarded
        .parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .or_else(|_| forwarded.parse::<IpAddr>())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| peer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    use survey_core::domain::{Principal, PrincipalKind, RateLimitPolicies, RateLimitPolicy};
    use survey_core::ports::{CounterStore, CounterStoreError};
    use survey_infra::InMemoryCounterStore;

    use crate::middleware::error::{HEADER_LIMIT, HEADER_REMAINING, HEADER_RETRY_AFTER};
    use crate::state::test_support::state_with_store;

    struct UnreachableStore;

    #[async_trait]
    impl CounterStore for UnreachableStore {
        async fn increment(&self, _key: &str, _ttl: Duration) -> Result<u64, CounterStoreError> {
            Err(CounterStoreError::Connection("connection refused".into()))
        }

        async fn get(&self, _key: &str) -> Result<Option<u64>, CounterStoreError> {
            Err(CounterStoreError::Connection("connection refused".into()))
        }

        async fn time_to_live(&self, _key: &str) -> Result<Duration, CounterStoreError> {
            Err(CounterStoreError::Connection("connection refused".into()))
        }
    }

    fn three_per_minute() -> RateLimitPolicies {
        RateLimitPolicies::new().with_override(
            RateLimitScope::ApiStandard,
            RateLimitPolicy::new(3, Duration::from_secs(60)).unwrap(),
        )
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    macro_rules! limited_app {
        ($state:expr) => {
            test::init_service(
                App::new().app_data(web::Data::new($state)).service(
                    web::resource("/limited")
                        .wrap(RateLimit::new(RateLimitScope::ApiStandard))
                        .route(web::get().to(ok)),
                )
                .service(
                    web::resource("/failing")
                        .wrap_fn(|_req, _srv| {
                            futures::future::err::<ServiceResponse, Error>(
                                AppError::internal("upstream middleware failed").into(),
                            )
                        })
                        .wrap(RateLimit::new(RateLimitScope::ApiStandard))
                        .route(web::get().to(ok)),
                ),
            )
            .await
        };
    }

    fn from_ip(ip: &str) -> test::TestRequest {
        let peer = SocketAddr::new(ip.parse().unwrap(), 54321);
        test::TestRequest::get().uri("/limited").peer_addr(peer)
    }

    #[actix_web::test]
    async fn test_allowed_requests_carry_budget_headers() {
        let state = state_with_store(Arc::new(InMemoryCounterStore::new()), three_per_minute());
        let app = limited_app!(state);

        for expected in ["2", "1", "0"] {
            let res = test::call_service(&app, from_ip("10.0.0.1").to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(res.headers().get(HEADER_LIMIT).unwrap(), "3");
            assert_eq!(res.headers().get(HEADER_REMAINING).unwrap(), expected);
        }
    }

    #[actix_web::test]
    async fn test_exhausted_budget_returns_429_envelope() {
        let state = state_with_store(Arc::new(InMemoryCounterStore::new()), three_per_minute());
        let app = limited_app!(state);

        for _ in 0..3 {
            test::call_service(&app, from_ip("10.0.0.2").to_request()).await;
        }

        let res = test::call_service(&app, from_ip("10.0.0.2").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry_after: u64 = res
            .headers()
            .get(HEADER_RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after > 0 && retry_after <= 60);
        assert_eq!(res.headers().get(HEADER_REMAINING).unwrap(), "0");

        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["errors"]["retry_after"], retry_after);
        assert_eq!(body["errors"]["rate_limit"], "3 requests per 60 seconds");
    }

    #[actix_web::test]
    async fn test_budgets_are_independent_per_identity() {
        let state = state_with_store(Arc::new(InMemoryCounterStore::new()), three_per_minute());
        let token = state
            .tokens
            .generate_token(&Principal::new(PrincipalKind::EndUser, "9"), "u@example.com")
            .unwrap();
        let app = limited_app!(state);

        for _ in 0..3 {
            test::call_service(&app, from_ip("10.0.0.3").to_request()).await;
        }
        let blocked = test::call_service(&app, from_ip("10.0.0.3").to_request()).await;
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

        let other_ip = test::call_service(&app, from_ip("10.0.0.4").to_request()).await;
        assert_eq!(other_ip.status(), StatusCode::OK);

        // Same IP, but the authenticated principal has its own budget
        let authenticated = test::call_service(
            &app,
            from_ip("10.0.0.3")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        assert_eq!(authenticated.status(), StatusCode::OK);
        assert_eq!(authenticated.headers().get(HEADER_REMAINING).unwrap(), "2");
    }

    #[actix_web::test]
    async fn test_store_outage_fails_closed() {
        let state = state_with_store(Arc::new(UnreachableStore), three_per_minute());
        let app = limited_app!(state);

        let res = test::call_service(&app, from_ip("10.0.0.5").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get(HEADER_RETRY_AFTER).unwrap(), "60");
    }

    #[actix_web::test]
    async fn test_forwarded_for_from_untrusted_peer_is_ignored() {
        let state = state_with_store(Arc::new(InMemoryCounterStore::new()), three_per_minute());
        let app = limited_app!(state);

        let mut statuses = Vec::new();
        for i in 0..5 {
            let req = from_ip("203.0.113.7")
                .insert_header(("x-forwarded-for", format!("10.9.9.{i}")))
                .to_request();
            statuses.push(test::call_service(&app, req).await.status());
        }

        assert_eq!(
            statuses,
            vec![
                StatusCode::OK,
                StatusCode::OK,
                StatusCode::OK,
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::TOO_MANY_REQUESTS
            ]
        );
    }

    #[actix_web::test]
    async fn test_trusted_proxy_forwards_client_address() {
        let mut state =
            state_with_store(Arc::new(InMemoryCounterStore::new()), three_per_minute());
        state.trusted_proxies = Arc::from(vec!["198.51.100.1".parse::<IpAddr>().unwrap()]);
        let app = limited_app!(state);

        for _ in 0..3 {
            let req = from_ip("198.51.100.1")
                .insert_header(("x-forwarded-for", "10.1.1.1"))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let same_client = from_ip("198.51.100.1")
            .insert_header(("x-forwarded-for", "10.1.1.1"))
            .to_request();
        assert_eq!(
            test::call_service(&app, same_client).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );

        let other_client = from_ip("198.51.100.1")
            .insert_header(("x-forwarded-for", "10.1.1.2"))
            .to_request();
        assert_eq!(test::call_service(&app, other_client).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_inner_service_error_keeps_budget_headers() {
        let state = state_with_store(Arc::new(InMemoryCounterStore::new()), three_per_minute());
        let app = limited_app!(state);

        let req = test::TestRequest::get()
            .uri("/failing")
            .peer_addr(SocketAddr::new("10.0.0.6".parse().unwrap(), 40000))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers().get(HEADER_LIMIT).unwrap(), "3");
        assert_eq!(res.headers().get(HEADER_REMAINING).unwrap(), "2");
    }
}
