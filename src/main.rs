use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;

use convertkit::api::configure_api;
use convertkit::api::monitoring::{configure_monitoring_routes, MonitoringState};
use convertkit::api::routes::AppState;
use convertkit::config::load_config;
use convertkit::converters::{AiClient, ConversionEngine, PdfToolkit};
use convertkit::database::{create_database_pool, run_migrations};
use convertkit::middleware::{CatchPanic, Cors, IdentityResolver, RequestTracking, SecurityHeaders, StaticTokenResolver};
use convertkit::monitoring::HealthChecker;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{context}: {err}");
    io::Error::other(format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    init_logging();

    info!("Starting convertkit v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config();
    let server_config = config.server.clone();

    info!("Connecting to database: {}", config.database.url);
    let pool = create_database_pool(&config.database)
        .await
        .map_err(|e| startup_error("Failed to create database pool", e))?;

    info!("Running database migrations");
    run_migrations(&pool)
        .await
        .map_err(|e| startup_error("Failed to run database migrations", e))?;

    if config.auth.api_tokens.is_empty() {
        warn!("No API tokens configured; every /api request will be rejected");
    }
    if config.ai.api_key.is_none() {
        warn!("No AI API key configured; ai_text and ai_code conversions will fail");
    }

    info!("Initializing services");
    let ai_client = AiClient::new(config.ai.clone()).map_err(|e| startup_error("Failed to build AI client", e))?;
    let engine = ConversionEngine::new(PdfToolkit::new(config.conversion.clone()), ai_client);

    let app_state = Arc::new(AppState::new(pool.clone(), &config, Arc::new(engine)));
    let monitoring_state = Arc::new(MonitoringState {
        health_checker: HealthChecker::new(pool.clone(), &config.conversion),
    });
    let resolver: Arc<dyn IdentityResolver> = Arc::new(StaticTokenResolver::new(&config.auth));

    info!("Starting convertkit server on {}:{}", server_config.host, server_config.port);
    info!(
        "Limits: file size {}MB, text length {} chars, tool timeout {:?}",
        config.conversion.max_file_size_mb, config.conversion.max_text_length, config.conversion.tool_timeout
    );

    let cors_origins = server_config.cors_origins.clone();
    let max_payload_size = server_config.max_payload_size;

    HttpServer::new(move || {
        App::new()
            .wrap(CatchPanic)
            .wrap(RequestTracking)
            .wrap(TracingLogger::default())
            .wrap(SecurityHeaders)
            .wrap(Cors::new(cors_origins.clone()))
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(monitoring_state.clone()))
            .app_data(web::PayloadConfig::new(max_payload_size))
            .configure(configure_api(resolver.clone(), max_payload_size))
            .configure(configure_monitoring_routes)
    })
    .client_request_timeout(server_config.client_timeout)
    .keep_alive(server_config.keep_alive)
    .bind((server_config.host, server_config.port))?
    .run()
    .await
}

fn init_logging() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "convertkit=info,actix_web=info".to_string());
    let log_format = std::env::var("CONVERTKIT_LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init();
    }
}
