use std::collections::BTreeMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One owner's conversions on one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStat {
    pub stat_date: NaiveDate,
    pub total_conversions: i64,
    pub successful_conversions: i64,
    pub failed_conversions: i64,
    pub total_processing_time_ms: i64,
    pub conversion_types: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_conversions: i64,
    pub successful_conversions: i64,
    pub failed_conversions: i64,
    pub total_processing_time_ms: i64,
    pub success_rate: f64,
    pub avg_processing_time_ms: f64,
    pub conversion_type_breakdown: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub summary: UsageSummary,
    pub daily_stats: Vec<UsageStat>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl UsageSummary {
    pub fn from_daily(stats: &[UsageStat]) -> Self {
        let mut summary = UsageSummary::default();

        for day in stats {
            summary.total_conversions += day.total_conversions;
            summary.successful_conversions += day.successful_conversions;
            summary.failed_conversions += day.failed_conversions;
            summary.total_processing_time_ms += day.total_processing_time_ms;
            for (tag, count) in &day.conversion_types {
                *summary.conversion_type_breakdown.entry(tag.clone()).or_insert(0) += count;
            }
        }

        if summary.total_conversions > 0 {
            let total = summary.total_conversions as f64;
            summary.success_rate = round2(summary.successful_conversions as f64 / total * 100.0);
            summary.avg_processing_time_ms = round2(summary.total_processing_time_ms as f64 / total);
        }

        summary
    }
}
