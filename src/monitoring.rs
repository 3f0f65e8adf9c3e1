use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::ConversionConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    pub staging_dir: CheckResult,
    pub tools: CheckResult,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: String,
    pub message: Option<String>,
    pub response_time_ms: Option<u64>,
}

impl CheckResult {
    fn new(status: &str, message: String, response_time_ms: Option<u64>) -> Self {
        Self { status: status.to_string(), message: Some(message), response_time_ms }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub struct HealthChecker {
    started: Instant,
    database_pool: SqlitePool,
    staging_dir: PathBuf,
    tools: Vec<(String, &'static str)>,
}

impl HealthChecker {
    pub fn new(database_pool: SqlitePool, conversion: &ConversionConfig) -> Self {
        Self {
            started: Instant::now(),
            database_pool,
            staging_dir: std::env::temp_dir(),
            tools: vec![
                (conversion.libreoffice_command.clone(), "--version"),
                (conversion.ghostscript_command.clone(), "--version"),
                (conversion.qpdf_command.clone(), "--version"),
            ],
        }
    }

    /// Database failure is critical. Missing tools or an unusable staging
    /// directory only degrade the file conversions.
    pub async fn get_health_status(&self) -> HealthStatus {
        let checks = HealthChecks {
            database: self.check_database().await,
            staging_dir: self.check_staging_dir().await,
            tools: self.check_tools().await,
        };

        let overall_status = if checks.database.is_healthy()
            && checks.staging_dir.is_healthy()
            && checks.tools.is_healthy()
        {
            "healthy"
        } else if checks.database.status == "critical" {
            "critical"
        } else {
            "degraded"
        };

        HealthStatus {
            status: overall_status.to_string(),
            timestamp: unix_timestamp(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started.elapsed().as_secs(),
            checks,
        }
    }

    pub async fn check_database(&self) -> CheckResult {
        let start = Instant::now();

        match sqlx::query("SELECT 1").fetch_one(&self.database_pool).await {
            Ok(_) => CheckResult::new(
                "healthy",
                "Database connection successful".to_string(),
                Some(start.elapsed().as_millis() as u64),
            ),
            Err(e) => CheckResult::new("critical", format!("Database connection failed: {e}"), None),
        }
    }

    async fn check_staging_dir(&self) -> CheckResult {
        match tokio::fs::metadata(&self.staging_dir).await {
            Ok(meta) if meta.is_dir() => {
                CheckResult::new("healthy", "Staging directory accessible".to_string(), Some(0))
            }
            Ok(_) => CheckResult::new("degraded", "Staging path is not a directory".to_string(), None),
            Err(e) => CheckResult::new("degraded", format!("Staging directory inaccessible: {e}"), None),
        }
    }

    async fn check_tools(&self) -> CheckResult {
        let start = Instant::now();
        let mut missing = Vec::new();

        for (program, version_flag) in &self.tools {
            let available = tokio::process::Command::new(program)
                .arg(version_flag)
                .kill_on_drop(true)
                .output()
                .await
                .map(|output| output.status.success())
                .unwrap_or(false);
            if !available {
                missing.push(program.as_str());
            }
        }

        if missing.is_empty() {
            CheckResult::new(
                "healthy",
                "All conversion tools available".to_string(),
                Some(start.elapsed().as_millis() as u64),
            )
        } else {
            CheckResult::new("degraded", format!("Missing conversion tools: {}", missing.join(", ")), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_in_memory_database;

    fn config_with_tool(tool: &str) -> ConversionConfig {
        ConversionConfig {
            libreoffice_command: tool.to_string(),
            ghostscript_command: tool.to_string(),
            qpdf_command: tool.to_string(),
            ..ConversionConfig::default()
        }
    }

    #[tokio::test]
    async fn missing_tools_degrade_but_database_stays_healthy() {
        let pool = create_in_memory_database().await.unwrap();
        let checker = HealthChecker::new(pool, &config_with_tool("convertkit-no-such-tool"));

        let status = checker.get_health_status().await;
        assert_eq!(status.status, "degraded");
        assert!(status.checks.database.is_healthy());
        assert!(status.checks.tools.message.unwrap().contains("convertkit-no-such-tool"));
    }

    #[tokio::test]
    async fn closed_pool_is_critical() {
        let pool = create_in_memory_database().await.unwrap();
        let checker = HealthChecker::new(pool.clone(), &config_with_tool("convertkit-no-such-tool"));
        pool.close().await;

        assert_eq!(checker.get_health_status().await.status, "critical");
    }
}
