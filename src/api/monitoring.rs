use crate::error::{AppError, AppResult};
use crate::monitoring::{unix_timestamp, HealthChecker};
use actix_web::{get, web, Responder};
use std::sync::Arc;

pub struct MonitoringState {
    pub health_checker: HealthChecker,
}

pub fn configure_monitoring_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}

#[get("/health")]
async fn health_check(data: web::Data<Arc<MonitoringState>>) -> AppResult<impl Responder> {
    let health_status = data.health_checker.get_health_status().await;

    match health_status.status.as_str() {
        "healthy" | "degraded" => Ok(web::Json(health_status)),
        _ => Err(AppError::Infrastructure("Service unhealthy".to_string())),
    }
}

// Ready as soon as the job store answers; file tools are optional.
#[get("/health/ready")]
async fn readiness_check(data: web::Data<Arc<MonitoringState>>) -> AppResult<impl Responder> {
    let database = data.health_checker.check_database().await;

    if database.is_healthy() {
        Ok(web::Json(serde_json::json!({
            "status": "ready",
            "timestamp": unix_timestamp()
        })))
    } else {
        Err(AppError::Infrastructure("Service not ready".to_string()))
    }
}

#[get("/health/live")]
async fn liveness_check() -> impl Responder {
    web::Json(serde_json::json!({
        "status": "alive",
        "timestamp": unix_timestamp()
    }))
}
