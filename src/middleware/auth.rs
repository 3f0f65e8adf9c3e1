use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::{ok, Ready};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

use crate::config::AuthConfig;
use crate::models::identity::Identity;

/// Maps a bearer credential to the caller it belongs to.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Option<Identity>;
}

/// Fixed `token -> owner` table loaded from configuration.
pub struct StaticTokenResolver {
    tokens: HashMap<String, String>,
}

impl StaticTokenResolver {
    pub fn new(config: &AuthConfig) -> Self {
        Self { tokens: config.api_tokens.clone() }
    }
}

impl IdentityResolver for StaticTokenResolver {
    fn resolve(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).map(|owner| Identity::new(owner.clone()))
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the caller and stores the `Identity` in request extensions.
/// Requests without a valid credential pass through unresolved; handlers
/// that need a caller reject them through the `Identity` extractor.
pub struct AuthMiddleware {
    resolver: Arc<dyn IdentityResolver>,
}

impl AuthMiddleware {
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { resolver }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service,
            resolver: self.resolver.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    resolver: Arc<dyn IdentityResolver>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match bearer_token(&req).and_then(|token| self.resolver.resolve(token)) {
            Some(identity) => {
                req.extensions_mut().insert(identity);
            }
            None => debug!(path = %req.path(), "Request carries no recognised credential"),
        }

        let fut = self.service.call(req);
        Box::pin(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    fn resolver() -> Arc<dyn IdentityResolver> {
        let config = AuthConfig {
            api_tokens: HashMap::from([("secret-a".to_string(), "alice".to_string())]),
        };
        Arc::new(StaticTokenResolver::new(&config))
    }

    async fn whoami(identity: Identity) -> HttpResponse {
        HttpResponse::Ok().body(identity.owner().to_string())
    }

    #[actix_web::test]
    async fn known_token_resolves_owner() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(resolver()))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Bearer secret-a"))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "alice");
    }

    #[actix_web::test]
    async fn unknown_or_malformed_credentials_are_unauthorized() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(resolver()))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        for header in ["Bearer wrong", "Basic secret-a", "Bearer", "secret-a"] {
            let req = test::TestRequest::get()
                .uri("/whoami")
                .insert_header(("Authorization", header))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 401, "header {header:?}");
        }
    }
}
