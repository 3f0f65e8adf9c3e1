use crate::error::{AppError, AppResult};
use crate::models::job::{ConversionJob, JobStatus};
use crate::models::usage::UsageStat;
use chrono::NaiveDate;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

#[derive(Clone)]
pub struct UsageRepository {
    pool: SqlitePool,
}

impl UsageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Adds a terminal job to its owner's bucket for the job's creation date.
    /// A single upsert, so concurrent writers never lose an increment.
    pub async fn record_conversion(tx: &mut Transaction<'_, Sqlite>, job: &ConversionJob) -> AppResult<()> {
        let succeeded = i64::from(job.status == JobStatus::Completed);
        let failed = i64::from(job.status == JobStatus::Failed);

        sqlx::query(
            r#"
            INSERT INTO usage_stats (owner, stat_date, total_conversions, successful_conversions,
                                     failed_conversions, total_processing_time_ms, conversion_types)
            VALUES (?1, ?2, 1, ?3, ?4, ?5, json_object(?6, 1))
            ON CONFLICT (owner, stat_date) DO UPDATE SET
                total_conversions = total_conversions + 1,
                successful_conversions = successful_conversions + excluded.successful_conversions,
                failed_conversions = failed_conversions + excluded.failed_conversions,
                total_processing_time_ms = total_processing_time_ms + excluded.total_processing_time_ms,
                conversion_types = json_set(
                    conversion_types,
                    '$.' || ?6,
                    COALESCE(json_extract(conversion_types, '$.' || ?6), 0) + 1
                )
            "#
        )
        .bind(&job.owner)
        .bind(job.created_at.date_naive())
        .bind(succeeded)
        .bind(failed)
        .bind(job.processing_time_ms.unwrap_or(0))
        .bind(job.conversion_type.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to record usage: {e}")))?;

        Ok(())
    }

    /// Buckets with `stat_date >= since`, oldest first.
    pub async fn daily_stats(&self, owner: &str, since: NaiveDate) -> AppResult<Vec<UsageStat>> {
        let rows = sqlx::query(
            r#"
            SELECT stat_date, total_conversions, successful_conversions, failed_conversions,
                   total_processing_time_ms, conversion_types
            FROM usage_stats
            WHERE owner = ? AND stat_date >= ?
            ORDER BY stat_date ASC
            "#
        )
        .bind(owner)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to load usage stats: {e}")))?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in rows {
            let conversion_types: String = row.try_get("conversion_types")
                .map_err(|e| AppError::Infrastructure(format!("Failed to decode usage row: {e}")))?;

            stats.push(UsageStat {
                stat_date: row.try_get("stat_date")
                    .map_err(|e| AppError::Infrastructure(format!("Failed to decode usage row: {e}")))?,
                total_conversions: row.try_get("total_conversions")
                    .map_err(|e| AppError::Infrastructure(format!("Failed to decode usage row: {e}")))?,
                successful_conversions: row.try_get("successful_conversions")
                    .map_err(|e| AppError::Infrastructure(format!("Failed to decode usage row: {e}")))?,
                failed_conversions: row.try_get("failed_conversions")
                    .map_err(|e| AppError::Infrastructure(format!("Failed to decode usage row: {e}")))?,
                total_processing_time_ms: row.try_get("total_processing_time_ms")
                    .map_err(|e| AppError::Infrastructure(format!("Failed to decode usage row: {e}")))?,
                conversion_types: serde_json::from_str(&conversion_types)
                    .map_err(|e| AppError::Infrastructure(format!("Failed to decode conversion types: {e}")))?,
            });
        }

        Ok(stats)
    }
}
