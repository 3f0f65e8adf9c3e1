use crate::error::{AppError, AppResult};
use crate::models::job::{ConversionJob, ConversionType, JobStatus};
use crate::services::usage_repository::UsageRepository;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const JOB_COLUMNS: &str = "id, owner, conversion_type, status, input_data, output_data, \
                           error_message, processing_time_ms, created_at, completed_at";

/// Equality filters for listing an owner's jobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobFilter {
    pub limit: u32,
    pub status: Option<JobStatus>,
    pub conversion_type: Option<ConversionType>,
}

#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_job(&self, job: &ConversionJob) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO conversion_jobs (id, owner, conversion_type, status, input_data, output_data,
                                         error_message, processing_time_ms, created_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&job.id)
        .bind(&job.owner)
        .bind(job.conversion_type.as_str())
        .bind(job.status.as_str())
        .bind(job.input_data.to_string())
        .bind(job.output_data.as_ref().map(Value::to_string))
        .bind(&job.error_message)
        .bind(job.processing_time_ms)
        .bind(job.created_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to create job: {e}")))?;

        Ok(())
    }

    /// Writes a terminal job and its usage increment atomically. The update
    /// only matches a row of the same owner that is still `processing`.
    pub async fn finalize_job(&self, job: &ConversionJob) -> AppResult<()> {
        if !job.status.is_terminal() {
            return Err(AppError::Internal(format!(
                "Job {} finalized in non-terminal state {}",
                job.id, job.status
            )));
        }

        let mut tx = self.pool.begin().await
            .map_err(|e| AppError::Infrastructure(format!("Failed to start transaction: {e}")))?;

        let result = sqlx::query(
            r#"
            UPDATE conversion_jobs
            SET status = ?, output_data = ?, error_message = ?, processing_time_ms = ?, completed_at = ?
            WHERE id = ? AND owner = ? AND status = ?
            "#
        )
        .bind(job.status.as_str())
        .bind(job.output_data.as_ref().map(Value::to_string))
        .bind(&job.error_message)
        .bind(job.processing_time_ms)
        .bind(job.completed_at)
        .bind(&job.id)
        .bind(&job.owner)
        .bind(JobStatus::Processing.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to finalize job: {e}")))?;

        if result.rows_affected() == 0 {
            tx.rollback().await
                .map_err(|e| AppError::Infrastructure(format!("Failed to rollback transaction: {e}")))?;
            return Err(AppError::Internal(format!("Job {} is not awaiting completion", job.id)));
        }

        UsageRepository::record_conversion(&mut tx, job).await?;

        tx.commit().await
            .map_err(|e| AppError::Infrastructure(format!("Failed to commit transaction: {e}")))?;

        Ok(())
    }

    pub async fn get_job(&self, owner: &str, job_id: &str) -> AppResult<Option<ConversionJob>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM conversion_jobs WHERE id = ? AND owner = ?");
        let row = sqlx::query(&sql)
        .bind(job_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to get job: {e}")))?;

        row.as_ref().map(row_to_job).transpose()
    }

    /// Newest first; rows with equal `created_at` fall back to insertion order.
    pub async fn list_jobs(&self, owner: &str, filter: &JobFilter) -> AppResult<Vec<ConversionJob>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {JOB_COLUMNS} FROM conversion_jobs WHERE owner = "
        ));
        builder.push_bind(owner);

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(conversion_type) = filter.conversion_type {
            builder.push(" AND conversion_type = ").push_bind(conversion_type.as_str());
        }

        builder
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(i64::from(filter.limit));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Infrastructure(format!("Failed to list jobs: {e}")))?;

        rows.iter().map(row_to_job).collect()
    }

    pub async fn count_jobs(&self, owner: &str) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM conversion_jobs WHERE owner = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Infrastructure(format!("Failed to count jobs: {e}")))?;

        row.try_get("total")
            .map_err(|e| AppError::Infrastructure(format!("Failed to read job count: {e}")))
    }
}

fn decode_err(column: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Infrastructure(format!("Failed to decode column {column}: {e}"))
}

fn row_to_job(row: &SqliteRow) -> AppResult<ConversionJob> {
    let conversion_type: String = row.try_get("conversion_type").map_err(|e| decode_err("conversion_type", e))?;
    let status: String = row.try_get("status").map_err(|e| decode_err("status", e))?;
    let input_data: String = row.try_get("input_data").map_err(|e| decode_err("input_data", e))?;
    let output_data: Option<String> = row.try_get("output_data").map_err(|e| decode_err("output_data", e))?;

    Ok(ConversionJob {
        id: row.try_get("id").map_err(|e| decode_err("id", e))?,
        owner: row.try_get("owner").map_err(|e| decode_err("owner", e))?,
        conversion_type: conversion_type.parse().map_err(|e| decode_err("conversion_type", e))?,
        status: status.parse().map_err(|e| decode_err("status", e))?,
        input_data: serde_json::from_str(&input_data).map_err(|e| decode_err("input_data", e))?,
        output_data: output_data
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| decode_err("output_data", e))?,
        error_message: row.try_get("error_message").map_err(|e| decode_err("error_message", e))?,
        processing_time_ms: row.try_get("processing_time_ms").map_err(|e| decode_err("processing_time_ms", e))?,
        created_at: row.try_get("created_at").map_err(|e| decode_err("created_at", e))?,
        completed_at: row.try_get("completed_at").map_err(|e| decode_err("completed_at", e))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_in_memory_database;
    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::json;
    use std::time::Duration;

    fn all(limit: u32) -> JobFilter {
        JobFilter { limit, status: None, conversion_type: None }
    }

    async fn insert(
        repo: &JobRepository,
        owner: &str,
        conversion_type: ConversionType,
        age_minutes: i64,
        succeed: bool,
    ) -> ConversionJob {
        let mut job = ConversionJob::new(owner.to_string(), conversion_type, json!({"n": age_minutes}));
        job.created_at = Utc::now() - ChronoDuration::minutes(age_minutes);
        job.start_processing().unwrap();
        repo.create_job(&job).await.unwrap();
        if succeed {
            job.mark_completed(json!({"ok": true}), Duration::from_millis(10)).unwrap();
        } else {
            job.mark_failed("tool exited with status 1".to_string(), Duration::from_millis(5)).unwrap();
        }
        repo.finalize_job(&job).await.unwrap();
        job
    }

    #[tokio::test]
    async fn lists_only_the_callers_jobs_newest_first() {
        let repo = JobRepository::new(create_in_memory_database().await.unwrap());
        let oldest = insert(&repo, "alice", ConversionType::CurrencyConvert, 30, true).await;
        insert(&repo, "bob", ConversionType::CurrencyConvert, 20, true).await;
        let newest = insert(&repo, "alice", ConversionType::UnitConvert, 10, true).await;

        let jobs = repo.list_jobs("alice", &all(50)).await.unwrap();
        let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec![newest.id.as_str(), oldest.id.as_str()]);
        assert!(jobs.iter().all(|j| j.owner == "alice"));
    }

    #[tokio::test]
    async fn limit_bounds_results() {
        let repo = JobRepository::new(create_in_memory_database().await.unwrap());
        for age in 0..5 {
            insert(&repo, "alice", ConversionType::CurrencyConvert, age, true).await;
        }

        assert_eq!(repo.list_jobs("alice", &all(3)).await.unwrap().len(), 3);
        assert!(repo.list_jobs("alice", &all(0)).await.unwrap().is_empty());
        assert_eq!(repo.count_jobs("alice").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn filters_combine_status_and_type() {
        let repo = JobRepository::new(create_in_memory_database().await.unwrap());
        insert(&repo, "alice", ConversionType::PdfMerge, 3, false).await;
        let wanted = insert(&repo, "alice", ConversionType::PdfMerge, 2, true).await;
        insert(&repo, "alice", ConversionType::CurrencyConvert, 1, true).await;

        let filter = JobFilter {
            limit: 50,
            status: Some(JobStatus::Completed),
            conversion_type: Some(ConversionType::PdfMerge),
        };
        let jobs = repo.list_jobs("alice", &filter).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, wanted.id);
    }

    #[tokio::test]
    async fn round_trips_terminal_fields() {
        let repo = JobRepository::new(create_in_memory_database().await.unwrap());
        let job = insert(&repo, "alice", ConversionType::PdfCompress, 1, false).await;

        let stored = repo.get_job("alice", &job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("tool exited with status 1"));
        assert_eq!(stored.processing_time_ms, Some(5));
        assert!(stored.output_data.is_none());
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn get_job_hides_other_owners_rows() {
        let repo = JobRepository::new(create_in_memory_database().await.unwrap());
        let job = insert(&repo, "alice", ConversionType::CurrencyConvert, 1, true).await;

        assert!(repo.get_job("bob", &job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn terminal_job_cannot_be_finalized_twice() {
        let repo = JobRepository::new(create_in_memory_database().await.unwrap());
        let job = insert(&repo, "alice", ConversionType::CurrencyConvert, 1, true).await;

        let err = repo.finalize_job(&job).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let stored = repo.get_job("alice", &job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn store_trigger_rejects_updates_to_terminal_rows() {
        let pool = create_in_memory_database().await.unwrap();
        let repo = JobRepository::new(pool.clone());
        let job = insert(&repo, "alice", ConversionType::CurrencyConvert, 1, true).await;

        let result = sqlx::query("UPDATE conversion_jobs SET status = 'processing' WHERE id = ?")
            .bind(&job.id)
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }
}
