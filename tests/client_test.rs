use actix_web::{dev::ServerHandle, web, App, HttpServer};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use convertkit::api::configure_api;
use convertkit::api::routes::AppState;
use convertkit::client::{ClientError, ConversionClient, ListOptions};
use convertkit::config::Config;
use convertkit::converters::{AiClient, ConversionEngine, PdfToolkit};
use convertkit::database::create_in_memory_database;
use convertkit::middleware::{CatchPanic, IdentityResolver, StaticTokenResolver};
use convertkit::models::job::{ConversionType, JobStatus};
use convertkit::models::payload::SubmitRequest;

async fn start_server() -> (String, ServerHandle) {
    let pool = create_in_memory_database().await.unwrap();

    let mut config = Config::default();
    config.auth.api_tokens = HashMap::from([("carol-token".to_string(), "carol".to_string())]);
    config.ai.api_key = None;

    let engine = ConversionEngine::new(
        PdfToolkit::new(config.conversion.clone()),
        AiClient::new(config.ai.clone()).unwrap(),
    );
    let app_state = Arc::new(AppState::new(pool, &config, Arc::new(engine)));
    let resolver: Arc<dyn IdentityResolver> = Arc::new(StaticTokenResolver::new(&config.auth));
    let json_limit = config.server.max_payload_size;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(CatchPanic)
            .app_data(web::Data::new(app_state.clone()))
            .configure(configure_api(resolver.clone(), json_limit))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    (format!("http://{addr}"), handle)
}

fn client(base_url: &str, token: &str) -> ConversionClient {
    ConversionClient::new(base_url, token, Duration::from_secs(10)).unwrap()
}

fn unit_request(value: f64) -> SubmitRequest {
    SubmitRequest {
        conversion_type: "unit_convert".to_string(),
        input_data: Some(json!({"category": "temperature", "value": value, "from_unit": "c", "to_unit": "f"})),
        ..SubmitRequest::default()
    }
}

#[actix_web::test]
async fn client_round_trip_through_live_server() {
    let (base_url, handle) = start_server().await;
    let carol = client(&base_url, "carol-token");

    let outcome = carol.submit(&unit_request(100.0)).await.unwrap();
    assert_eq!(outcome.result["converted_value"], 212.0);

    let jobs = carol.list(&ListOptions::default()).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, outcome.job_id);
    assert_eq!(jobs[0].status, JobStatus::Completed);

    let job = carol.get(&outcome.job_id).await.unwrap();
    assert_eq!(job.conversion_type, ConversionType::UnitConvert);

    let report = carol.summarize(Some(7)).await.unwrap();
    assert_eq!(report.summary.total_conversions, 1);
    assert_eq!(report.summary.success_rate, 100.0);

    handle.stop(false).await;
}

#[actix_web::test]
async fn client_maps_server_errors() {
    let (base_url, handle) = start_server().await;
    let carol = client(&base_url, "carol-token");

    let err = client(&base_url, "stolen").summarize(None).await.unwrap_err();
    assert_eq!(err, ClientError::Unauthorized);

    let err = carol.submit(&SubmitRequest::default()).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(_)));

    let err = carol.get("does-not-exist").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));

    let err = carol.submit(&unit_request(-500.0)).await.unwrap_err();
    match err {
        ClientError::ConversionFailed { message, processing_time_ms } => {
            assert!(message.to_lowercase().contains("absolute zero"), "{message}");
            assert!(processing_time_ms.is_some());
        }
        other => panic!("expected conversion failure, got {other:?}"),
    }

    let failed = carol
        .list(&ListOptions { status: Some(JobStatus::Failed), ..ListOptions::default() })
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);

    handle.stop(false).await;
}
