use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use std::fmt::Debug;
use tracing::error;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    Unauthorized,
    Validation(String),
    NotFound(String),
    ConversionFailed {
        message: String,
        processing_time_ms: i64,
    },
    Infrastructure(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    success: bool,
    error: &'a str,
    error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    processing_time_ms: Option<i64>,
}

impl AppError {
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::ConversionFailed { .. } => "conversion_failure",
            AppError::Infrastructure(_) => "infrastructure_failure",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show to the caller. Infrastructure and internal
    /// details stay in the logs.
    pub fn public_message(&self) -> &str {
        match self {
            AppError::Unauthorized => "Unauthorized",
            AppError::Validation(msg) | AppError::NotFound(msg) => msg,
            AppError::ConversionFailed { message, .. } => message,
            AppError::Infrastructure(_) => "Service temporarily unavailable",
            AppError::Internal(_) => "Internal server error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Validation(msg) => write!(f, "Validation error: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not Found error: {msg}"),
            AppError::ConversionFailed { message, processing_time_ms } => {
                write!(f, "Conversion failed after {processing_time_ms}ms: {message}")
            }
            AppError::Infrastructure(msg) => write!(f, "Infrastructure error: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConversionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Infrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Infrastructure(detail) => {
                error!(target: "audit", error_type = self.error_type(), "{detail}");
            }
            AppError::Internal(detail) => {
                error!(error_type = self.error_type(), "{detail}");
            }
            _ => {}
        }

        let processing_time_ms = match self {
            AppError::ConversionFailed { processing_time_ms, .. } => Some(*processing_time_ms),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error: self.public_message(),
            error_type: self.error_type(),
            processing_time_ms,
        };

        let mut response = HttpResponse::build(self.status_code());
        if matches!(self, AppError::Unauthorized) {
            response.insert_header(("WWW-Authenticate", "Bearer realm=\"convertkit\""));
        }
        response.json(body)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn infrastructure_detail_is_not_leaked() {
        let err = AppError::Infrastructure("database is locked at /var/db".to_string());
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Service temporarily unavailable");
        assert!(!body.to_string().contains("/var/db"));
    }

    #[actix_web::test]
    async fn unauthorized_uses_generic_message() {
        let response = AppError::Unauthorized.error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));

        let body = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Unauthorized");
    }

    #[actix_web::test]
    async fn conversion_failure_reports_timing() {
        let err = AppError::ConversionFailed {
            message: "Unsupported currency: XYZ".to_string(),
            processing_time_ms: 12,
        };
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Unsupported currency: XYZ");
        assert_eq!(body["processing_time_ms"], 12);
    }
}
