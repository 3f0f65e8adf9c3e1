use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage, HttpRequest,
};
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id assigned to a request, stored in its extensions.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

/// Correlation id of a request that passed through [`RequestTracking`].
pub fn correlation_id(req: &HttpRequest) -> Option<String> {
    req.extensions().get::<CorrelationId>().map(|id| id.0.clone())
}

fn incoming_request_id(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let usable = !value.is_empty()
        && value.len() <= 128
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    usable.then(|| value.to_string())
}

pub struct RequestTracking;

impl<S, B> Transform<S, ServiceRequest> for RequestTracking
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestTrackingMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTrackingMiddleware { service }))
    }
}

pub struct RequestTrackingMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestTrackingMiddleware<S>
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
        let start_time = Instant::now();
        let correlation_id = incoming_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
        let method = req.method().to_string();
        let path = req.path().to_string();

        req.extensions_mut().insert(CorrelationId(correlation_id.clone()));

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %method,
            path = %path
        );

        let fut = self.service.call(req);

        Box::pin(
            async move {
                info!("Request started");

                let result = fut.await;
                let duration_ms = start_time.elapsed().as_millis() as u64;

                match result {
                    Ok(mut response) => {
                        let status = response.status().as_u16();
                        if status >= 400 {
                            warn!(status, duration_ms, "Request completed with error");
                        } else {
                            info!(status, duration_ms, "Request completed successfully");
                        }

                        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
                            response
                                .headers_mut()
                                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                        }
                        Ok(response)
                    }
                    Err(error) => {
                        warn!(error = %error, duration_ms, "Request failed with error");
                        Err(error)
                    }
                }
            }
            .instrument(span),
        )
    }
}
