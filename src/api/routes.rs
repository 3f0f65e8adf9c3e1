use crate::config::Config;
use crate::converters::Converter;
use crate::error::{AppError, AppResult};
use crate::models::identity::Identity;
use crate::models::job::ConversionJob;
use crate::models::payload::{ConversionOutput, SubmitRequest};
use crate::models::usage::{UsageStat, UsageSummary};
use crate::services::{
    ConversionService, JobQueryService, JobRepository, RequestValidator, UsageRepository, UsageService,
};
use actix_web::{error::InternalError, get, post, web, HttpRequest, Responder, ResponseError};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct AppState {
    pub conversions: ConversionService,
    pub queries: JobQueryService,
    pub usage: UsageService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config, converter: Arc<dyn Converter>) -> Self {
        let jobs = JobRepository::new(pool.clone());
        Self {
            conversions: ConversionService::new(
                jobs.clone(),
                converter,
                RequestValidator::new(&config.conversion),
            ),
            queries: JobQueryService::new(jobs, config.query),
            usage: UsageService::new(UsageRepository::new(pool), config.usage),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct SubmitResponse {
    pub success: bool,
    pub job_id: String,
    pub result: ConversionOutput,
    pub processing_time_ms: i64,
}

#[derive(Serialize, Debug)]
pub struct JobListResponse {
    pub success: bool,
    pub jobs: Vec<ConversionJob>,
    pub count: usize,
}

#[derive(Serialize, Debug)]
pub struct JobResponse {
    pub success: bool,
    pub job: ConversionJob,
}

#[derive(Serialize, Debug)]
pub struct UsageResponse {
    pub success: bool,
    pub summary: UsageSummary,
    pub daily_stats: Vec<UsageStat>,
}

#[derive(Deserialize, Debug, Default)]
pub struct JobListQuery {
    pub limit: Option<u32>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub conversion_type: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UsageQuery {
    pub days: Option<u32>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(submit_conversion)
        .service(list_conversions)
        .service(get_conversion)
        .service(usage_summary);
}

/// JSON body errors become validation errors so clients get the usual
/// `{success: false, ...}` envelope.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req: &HttpRequest| {
            let app_error = AppError::Validation(format!("Invalid request body: {err}"));
            InternalError::from_response(err, app_error.error_response()).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        let app_error = AppError::Validation(format!("Invalid query string: {err}"));
        InternalError::from_response(err, app_error.error_response()).into()
    })
}

#[post("/conversions")]
#[instrument(skip(data, request), fields(owner = %identity.owner()))]
async fn submit_conversion(
    identity: Identity,
    data: web::Data<Arc<AppState>>,
    request: web::Json<SubmitRequest>,
) -> AppResult<impl Responder> {
    let receipt = data.conversions.submit(&identity, request.into_inner()).await?;

    info!(job_id = %receipt.job_id, "Conversion request served");
    Ok(web::Json(SubmitResponse {
        success: true,
        job_id: receipt.job_id,
        result: receipt.result,
        processing_time_ms: receipt.processing_time_ms,
    }))
}

#[get("/conversions")]
#[instrument(skip(data), fields(owner = %identity.owner()))]
async fn list_conversions(
    identity: Identity,
    data: web::Data<Arc<AppState>>,
    query: web::Query<JobListQuery>,
) -> AppResult<impl Responder> {
    let filter = data.queries.build_filter(
        query.limit,
        query.status.as_deref(),
        query.conversion_type.as_deref(),
    )?;

    let jobs = data.queries.list(&identity, &filter).await;

    debug!("Listing {} jobs", jobs.len());
    Ok(web::Json(JobListResponse { success: true, count: jobs.len(), jobs }))
}

#[get("/conversions/{job_id}")]
#[instrument(skip(data), fields(owner = %identity.owner(), job_id = %job_id))]
async fn get_conversion(
    identity: Identity,
    data: web::Data<Arc<AppState>>,
    job_id: web::Path<String>,
) -> AppResult<impl Responder> {
    let job = data.queries.get(&identity, job_id.as_str()).await?;
    Ok(web::Json(JobResponse { success: true, job }))
}

#[get("/usage")]
#[instrument(skip(data), fields(owner = %identity.owner()))]
async fn usage_summary(
    identity: Identity,
    data: web::Data<Arc<AppState>>,
    query: web::Query<UsageQuery>,
) -> AppResult<impl Responder> {
    let days = data.usage.resolve_days(query.days)?;
    let report = data.usage.summarize(&identity, days).await;

    Ok(web::Json(UsageResponse {
        success: true,
        summary: report.summary,
        daily_stats: report.daily_stats,
    }))
}
