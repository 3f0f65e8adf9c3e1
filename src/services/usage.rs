use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use tracing::{error, instrument};

use crate::config::UsageConfig;
use crate::error::{AppError, AppResult};
use crate::models::identity::Identity;
use crate::models::usage::{UsageReport, UsageSummary};
use crate::services::usage_repository::UsageRepository;

#[derive(Clone)]
pub struct UsageService {
    usage: UsageRepository,
    config: UsageConfig,
}

impl UsageService {
    pub fn new(usage: UsageRepository, config: UsageConfig) -> Self {
        Self { usage, config }
    }

    pub fn resolve_days(&self, days: Option<u32>) -> AppResult<u32> {
        let days = days.unwrap_or(self.config.default_days);
        if days == 0 || days > self.config.max_days {
            return Err(AppError::Validation(format!(
                "days must be between 1 and {}",
                self.config.max_days
            )));
        }
        Ok(days)
    }

    pub async fn summarize(&self, identity: &Identity, days: u32) -> UsageReport {
        self.summarize_at(identity, days, Utc::now()).await
    }

    /// Window starts on the UTC date `days` before `now`, inclusive.
    /// A store failure degrades to an all-zero report.
    #[instrument(skip(self, now), fields(owner = %identity.owner()))]
    pub async fn summarize_at(&self, identity: &Identity, days: u32, now: DateTime<Utc>) -> UsageReport {
        let since = window_start(now, days);

        match self.usage.daily_stats(identity.owner(), since).await {
            Ok(daily_stats) => UsageReport {
                summary: UsageSummary::from_daily(&daily_stats),
                daily_stats,
            },
            Err(e) => {
                error!(target: "audit", owner = %identity.owner(), error = %e, "Usage summary degraded to empty result");
                UsageReport::default()
            }
        }
    }
}

fn window_start(now: DateTime<Utc>, days: u32) -> NaiveDate {
    (now - ChronoDuration::days(i64::from(days))).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_in_memory_database;
    use crate::models::job::{ConversionJob, ConversionType};
    use crate::services::job_repository::JobRepository;
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    async fn setup() -> (UsageService, JobRepository, sqlx::SqlitePool) {
        let pool = create_in_memory_database().await.unwrap();
        let service = UsageService::new(UsageRepository::new(pool.clone()), UsageConfig::default());
        (service, JobRepository::new(pool.clone()), pool)
    }

    async fn record(jobs: &JobRepository, owner: &str, created_at: DateTime<Utc>, succeed: bool) {
        let mut job = ConversionJob::new(owner.to_string(), ConversionType::CurrencyConvert, json!({}));
        job.created_at = created_at;
        job.start_processing().unwrap();
        jobs.create_job(&job).await.unwrap();
        if succeed {
            job.mark_completed(json!({}), Duration::from_millis(30)).unwrap();
        } else {
            job.mark_failed("nope".to_string(), Duration::from_millis(10)).unwrap();
        }
        jobs.finalize_job(&job).await.unwrap();
    }

    #[test]
    fn window_start_is_inclusive_calendar_date() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap();
        assert_eq!(window_start(now, 7), NaiveDate::from_ymd_opt(2026, 10, 7).unwrap());
        assert_eq!(window_start(now, 1), NaiveDate::from_ymd_opt(2026, 10, 13).unwrap());
    }

    #[tokio::test]
    async fn days_default_and_bounds() {
        let (service, _, _) = setup().await;
        assert_eq!(service.resolve_days(None).unwrap(), 30);
        assert_eq!(service.resolve_days(Some(7)).unwrap(), 7);
        assert!(service.resolve_days(Some(0)).is_err());
        assert!(service.resolve_days(Some(366)).is_err());
    }

    #[tokio::test]
    async fn summarizes_window_for_owner() {
        let (service, jobs, _) = setup().await;
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();

        record(&jobs, "alice", now - ChronoDuration::days(1), true).await;
        record(&jobs, "alice", now - ChronoDuration::days(2), true).await;
        record(&jobs, "alice", now - ChronoDuration::days(7), true).await;
        record(&jobs, "alice", now, false).await;
        record(&jobs, "alice", now - ChronoDuration::days(8), true).await;
        record(&jobs, "bob", now, true).await;

        let report = service.summarize_at(&Identity::new("alice"), 7, now).await;
        assert_eq!(report.summary.total_conversions, 4);
        assert_eq!(report.summary.successful_conversions, 3);
        assert_eq!(report.summary.failed_conversions, 1);
        assert_eq!(report.summary.success_rate, 75.0);
        assert_eq!(report.summary.avg_processing_time_ms, 25.0);
        assert_eq!(report.summary.conversion_type_breakdown.get("currency_convert"), Some(&4));
        assert_eq!(report.daily_stats.len(), 4);
        assert!(report.daily_stats.windows(2).all(|w| w[0].stat_date < w[1].stat_date));
    }

    #[tokio::test]
    async fn empty_window_is_all_zero() {
        let (service, _, _) = setup().await;
        let report = service.summarize(&Identity::new("nobody"), 30).await;
        assert_eq!(report, UsageReport::default());
    }

    #[tokio::test]
    async fn store_failure_degrades_to_default() {
        let (service, jobs, pool) = setup().await;
        record(&jobs, "alice", Utc::now(), true).await;
        pool.close().await;

        let report = service.summarize(&Identity::new("alice"), 30).await;
        assert_eq!(report.summary.total_conversions, 0);
        assert!(report.daily_stats.is_empty());
    }
}
