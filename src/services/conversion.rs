use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::converters::{ConversionError, Converter};
use crate::error::{AppError, AppResult};
use crate::models::identity::Identity;
use crate::models::job::ConversionJob;
use crate::models::payload::{ConversionOutput, SubmitRequest};
use crate::services::job_repository::JobRepository;
use crate::services::validation::RequestValidator;

/// Successful submission, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReceipt {
    pub job_id: String,
    pub result: ConversionOutput,
    pub processing_time_ms: i64,
}

/// Accepts conversions and owns every write to the job store.
///
/// A submission that passes validation produces exactly one job row,
/// whatever the delegate does afterwards. Failures are recorded and
/// returned; nothing is retried.
#[derive(Clone)]
pub struct ConversionService {
    jobs: JobRepository,
    converter: Arc<dyn Converter>,
    validator: RequestValidator,
}

impl ConversionService {
    pub fn new(jobs: JobRepository, converter: Arc<dyn Converter>, validator: RequestValidator) -> Self {
        Self { jobs, converter, validator }
    }

    #[instrument(skip(self, request), fields(owner = %identity.owner(), conversion_type = %request.conversion_type))]
    pub async fn submit(&self, identity: &Identity, request: SubmitRequest) -> AppResult<ConversionReceipt> {
        let input = self.validator.parse_submission(request)?;

        let mut job = ConversionJob::new(
            identity.owner().to_string(),
            input.conversion_type(),
            input.audit_payload(),
        );
        job.start_processing()?;
        self.jobs.create_job(&job).await?;

        info!(job_id = %job.id, "Conversion started");

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.converter.convert(&input))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(job_id = %job.id, "Converter panicked");
                Err(ConversionError::Tool("Conversion failed unexpectedly".to_string()))
            });
        let elapsed = started.elapsed();

        match outcome {
            Ok(output) => {
                job.mark_completed(output.audit_payload(), elapsed)?;
                self.jobs.finalize_job(&job).await?;

                let processing_time_ms = job.processing_time_ms.unwrap_or_default();
                info!(job_id = %job.id, processing_time_ms, "Conversion completed");

                Ok(ConversionReceipt { job_id: job.id, result: output, processing_time_ms })
            }
            Err(e) => {
                let message = e.to_string();
                job.mark_failed(message.clone(), elapsed)?;
                self.jobs.finalize_job(&job).await?;

                let processing_time_ms = job.processing_time_ms.unwrap_or_default();
                warn!(job_id = %job.id, processing_time_ms, error = %message, "Conversion failed");

                Err(AppError::ConversionFailed { message, processing_time_ms })
            }
        }
    }
}
