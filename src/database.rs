use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

pub async fn create_database_pool(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    let database_url = config.url.as_str();

    // Every connection to an in-memory URL opens a fresh database, so keep a
    // single connection alive for the lifetime of the pool.
    if is_in_memory(database_url) {
        tracing::info!("Using in-memory database");
        return SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Infrastructure(format!("Failed to create database pool: {e}")));
    }

    let db_path = database_url.trim_start_matches("sqlite://");
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    tracing::info!("Database file path: {}", db_path);

    if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tracing::info!("Creating database directory: {:?}", parent);
        tokio::fs::create_dir_all(parent).await
            .map_err(|e| AppError::Infrastructure(format!("Failed to create database directory: {e}")))?;
    }

    let connection_url = if database_url.contains('?') {
        format!("{database_url}&mode=rwc")
    } else {
        format!("{database_url}?mode=rwc")
    };

    let max_connections = config.max_connections.unwrap_or_else(|| {
        // Default to 4x CPU cores, min 10, max 100
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        (cpus * 4).clamp(10, 100) as u32
    });

    tracing::info!("Configuring database pool with {} max connections", max_connections);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&connection_url)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to create database pool: {e}")))
}

pub async fn run_migrations(pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to run migrations: {e}")))?;

    tracing::info!("Applying SQLite pragmas");

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to set journal mode: {e}")))?;

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await
        .map_err(|e| AppError::Infrastructure(format!("Failed to set synchronous mode: {e}")))?;

    Ok(())
}

/// In-memory pool with migrations applied.
pub async fn create_in_memory_database() -> AppResult<SqlitePool> {
    let pool = create_database_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
    })
    .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
