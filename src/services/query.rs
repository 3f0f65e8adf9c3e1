use tracing::{debug, error, instrument};

use crate::config::QueryConfig;
use crate::error::{AppError, AppResult};
use crate::models::identity::Identity;
use crate::models::job::{ConversionJob, ConversionType, JobStatus};
use crate::services::job_repository::{JobFilter, JobRepository};

#[derive(Clone)]
pub struct JobQueryService {
    jobs: JobRepository,
    config: QueryConfig,
}

impl JobQueryService {
    pub fn new(jobs: JobRepository, config: QueryConfig) -> Self {
        Self { jobs, config }
    }

    /// Validates raw query parameters. `limit` falls back to the default
    /// and is capped at the configured maximum.
    pub fn build_filter(
        &self,
        limit: Option<u32>,
        status: Option<&str>,
        conversion_type: Option<&str>,
    ) -> AppResult<JobFilter> {
        let status = status
            .filter(|s| !s.is_empty())
            .map(str::parse::<JobStatus>)
            .transpose()
            .map_err(AppError::Validation)?;

        let conversion_type = conversion_type
            .filter(|t| !t.is_empty())
            .map(str::parse::<ConversionType>)
            .transpose()
            .map_err(AppError::Validation)?;

        Ok(JobFilter {
            limit: limit.unwrap_or(self.config.default_limit).min(self.config.max_limit),
            status,
            conversion_type,
        })
    }

    /// A store failure degrades to an empty list. It is logged on the
    /// `audit` target so alerting can still see it.
    #[instrument(skip(self), fields(owner = %identity.owner()))]
    pub async fn list(&self, identity: &Identity, filter: &JobFilter) -> Vec<ConversionJob> {
        match self.jobs.list_jobs(identity.owner(), filter).await {
            Ok(jobs) => {
                debug!("Returning {} jobs", jobs.len());
                jobs
            }
            Err(e) => {
                error!(target: "audit", owner = %identity.owner(), error = %e, "Job listing degraded to empty result");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self), fields(owner = %identity.owner()))]
    pub async fn get(&self, identity: &Identity, job_id: &str) -> AppResult<ConversionJob> {
        self.jobs
            .get_job(identity.owner(), job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job not found: {job_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_in_memory_database;
    use serde_json::json;
    use std::time::Duration;

    async fn service() -> (JobQueryService, JobRepository, sqlx::SqlitePool) {
        let pool = create_in_memory_database().await.unwrap();
        let jobs = JobRepository::new(pool.clone());
        (JobQueryService::new(jobs.clone(), QueryConfig::default()), jobs, pool)
    }

    async fn completed(jobs: &JobRepository, owner: &str) -> ConversionJob {
        let mut job = ConversionJob::new(owner.to_string(), ConversionType::UnitConvert, json!({}));
        job.start_processing().unwrap();
        jobs.create_job(&job).await.unwrap();
        job.mark_completed(json!({}), Duration::from_millis(1)).unwrap();
        jobs.finalize_job(&job).await.unwrap();
        job
    }

    #[tokio::test]
    async fn filter_defaults_and_caps_limit() {
        let (service, _, _) = service().await;
        assert_eq!(service.build_filter(None, None, None).unwrap().limit, 50);
        assert_eq!(service.build_filter(Some(10), None, None).unwrap().limit, 10);
        assert_eq!(service.build_filter(Some(5000), None, None).unwrap().limit, 100);
    }

    #[tokio::test]
    async fn filter_rejects_unknown_values() {
        let (service, _, _) = service().await;
        assert!(matches!(service.build_filter(None, Some("archived"), None), Err(AppError::Validation(_))));
        assert!(matches!(service.build_filter(None, None, Some("zip")), Err(AppError::Validation(_))));

        let filter = service.build_filter(None, Some("failed"), Some("pdf_merge")).unwrap();
        assert_eq!(filter.status, Some(JobStatus::Failed));
        assert_eq!(filter.conversion_type, Some(ConversionType::PdfMerge));
    }

    #[tokio::test]
    async fn repeated_listing_is_stable() {
        let (service, jobs, _) = service().await;
        for _ in 0..3 {
            completed(&jobs, "alice").await;
        }
        let alice = Identity::new("alice");
        let filter = service.build_filter(None, None, None).unwrap();

        let first = service.list(&alice, &filter).await;
        let second = service.list(&alice, &filter).await;
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn store_failure_returns_empty_list() {
        let (service, jobs, pool) = service().await;
        completed(&jobs, "alice").await;
        pool.close().await;

        let filter = service.build_filter(None, None, None).unwrap();
        assert!(service.list(&Identity::new("alice"), &filter).await.is_empty());
    }

    #[tokio::test]
    async fn get_is_owner_scoped() {
        let (service, jobs, _) = service().await;
        let job = completed(&jobs, "alice").await;

        assert_eq!(service.get(&Identity::new("alice"), &job.id).await.unwrap().id, job.id);
        assert!(matches!(
            service.get(&Identity::new("bob"), &job.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
