pub mod auth;
pub mod request_tracking;

pub use auth::{AuthMiddleware, IdentityResolver, StaticTokenResolver};
pub use request_tracking::{correlation_id, RequestTracking};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{
            self, HeaderValue, CONTENT_SECURITY_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        Method,
    },
    Error, HttpResponse, ResponseError,
};
use futures::future::{ok, FutureExt, Ready};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::rc::Rc;
use tracing::error;

use crate::error::AppError;

// Security Headers Middleware
pub struct SecurityHeaders;

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SecurityHeadersMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecurityHeadersMiddleware { service })
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
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
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;

            let headers = res.headers_mut();
            headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
            headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
            headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
            headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static("default-src 'none'"));
            headers.insert(
                STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static("max-age=31536000; includeSubDomains"),
            );

            Ok(res)
        })
    }
}

/// Origin allow-list. `*` in the list admits any origin.
#[derive(Clone)]
pub struct Cors {
    allowed_origins: Rc<Vec<String>>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins: Rc::new(allowed_origins) }
    }
}

fn allowed_origin(allowed: &[String], req: &ServiceRequest) -> Option<HeaderValue> {
    let origin = req.headers().get(header::ORIGIN)?;
    let origin_str = origin.to_str().ok()?;
    allowed
        .iter()
        .any(|o| o == "*" || o == origin_str)
        .then(|| origin.clone())
}

impl<S, B> Transform<S, ServiceRequest> for Cors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CorsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CorsMiddleware {
            service,
            allowed_origins: self.allowed_origins.clone(),
        })
    }
}

pub struct CorsMiddleware<S> {
    service: S,
    allowed_origins: Rc<Vec<String>>,
}

impl<S, B> Service<ServiceRequest> for CorsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let origin = allowed_origin(&self.allowed_origins, &req);

        let is_preflight = req.method() == Method::OPTIONS
            && req.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);
        if is_preflight {
            let mut response = HttpResponse::NoContent();
            if let Some(origin) = origin {
                response
                    .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, origin))
                    .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"))
                    .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Authorization, Content-Type, X-Request-Id"))
                    .insert_header((header::ACCESS_CONTROL_MAX_AGE, "3600"));
            }
            response.insert_header((header::VARY, "Origin"));
            let response = response.finish();
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;

            let headers = res.headers_mut();
            if let Some(origin) = origin {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
                headers.insert(
                    header::ACCESS_CONTROL_EXPOSE_HEADERS,
                    HeaderValue::from_static("x-request-id"),
                );
            }
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));

            Ok(res.map_into_left_body())
        })
    }
}

/// Converts a panicking handler into the generic internal-error response.
pub struct CatchPanic;

impl<S, B> Transform<S, ServiceRequest> for CatchPanic
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CatchPanicMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CatchPanicMiddleware { service })
    }
}

pub struct CatchPanicMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for CatchPanicMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let http_req = req.request().clone();
        let fut = self.service.call(req);

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result.map(ServiceResponse::map_into_left_body),
                Err(panic) => {
                    let detail = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic payload".to_string());
                    let request_id = correlation_id(&http_req).unwrap_or_default();
                    error!(
                        correlation_id = %request_id,
                        path = %http_req.path(),
                        panic = %detail,
                        "Request handler panicked"
                    );

                    let response = AppError::Internal(detail).error_response();
                    Ok(ServiceResponse::new(http_req, response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    async fn boom() -> HttpResponse {
        panic!("handler exploded");
    }

    #[actix_web::test]
    async fn panicking_handler_returns_generic_500() {
        let app = test::init_service(
            App::new()
                .wrap(CatchPanic)
                .route("/boom", web::get().to(boom))
                .route("/ok", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/boom").to_request()).await;
        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_type"], "internal_error");
        assert!(!body["error"].as_str().unwrap().contains("exploded"));

        let resp = test::call_service(&app, test::TestRequest::get().uri("/ok").to_request()).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn panic_response_keeps_the_request_id() {
        let app = test::init_service(
            App::new()
                .wrap(CatchPanic)
                .wrap(RequestTracking)
                .route("/boom", web::get().to(boom)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/boom")
            .insert_header((request_tracking::REQUEST_ID_HEADER, "panic-7"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);
        assert_eq!(resp.headers().get(request_tracking::REQUEST_ID_HEADER).unwrap(), "panic-7");
    }

    #[actix_web::test]
    async fn cors_echoes_only_allowed_origins() {
        let app = test::init_service(
            App::new()
                .wrap(Cors::new(vec!["http://localhost:3000".to_string()]))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "http://localhost:3000"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "http://evil.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/")
            .insert_header((header::ORIGIN, "http://localhost:3000"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 204);
        assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }
}
