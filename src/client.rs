//! HTTP client for the conversion API.
//!
//! Every call returns `Result<T, ClientError>`. Server error envelopes are
//! mapped onto the variants a presentation layer needs to branch on, and
//! [`ClientError::user_message`] gives it a short notice to display.

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::models::job::{ConversionJob, ConversionType, JobStatus};
use crate::models::payload::SubmitRequest;
use crate::models::usage::{UsageReport, UsageStat, UsageSummary};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    Unauthorized,
    Rejected(String),
    NotFound(String),
    ConversionFailed { message: String, processing_time_ms: Option<i64> },
    Unavailable(String),
    Transport(String),
}

impl ClientError {
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized => "Please sign in again to continue.".to_string(),
            ClientError::Rejected(msg) => format!("Please check your input: {msg}"),
            ClientError::NotFound(_) => "That conversion could not be found.".to_string(),
            ClientError::ConversionFailed { message, .. } => format!("Conversion failed: {message}"),
            ClientError::Unavailable(_) => {
                "The service is temporarily unavailable. Please try again later.".to_string()
            }
            ClientError::Transport(_) => "Could not reach the conversion service.".to_string(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Unauthorized => write!(f, "Unauthorized"),
            ClientError::Rejected(msg) => write!(f, "Request rejected: {msg}"),
            ClientError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ClientError::ConversionFailed { message, .. } => write!(f, "Conversion failed: {message}"),
            ClientError::Unavailable(msg) => write!(f, "Service unavailable: {msg}"),
            ClientError::Transport(msg) => write!(f, "Transport error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Successful submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitOutcome {
    pub job_id: String,
    pub result: Value,
    pub processing_time_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: Option<u32>,
    pub status: Option<JobStatus>,
    pub conversion_type: Option<ConversionType>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: String,
    #[serde(default)]
    processing_time_ms: Option<i64>,
}

#[derive(Deserialize)]
struct JobListEnvelope {
    jobs: Vec<ConversionJob>,
}

#[derive(Deserialize)]
struct JobEnvelope {
    job: ConversionJob,
}

#[derive(Deserialize)]
struct UsageEnvelope {
    summary: UsageSummary,
    daily_stats: Vec<UsageStat>,
}

#[derive(Clone)]
pub struct ConversionClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl ConversionClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(&base_url.into())
            .map_err(|e| ClientError::Transport(format!("Invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Transport(format!("Invalid base URL: {base_url}")));
        }
        Ok(Self { http, base_url, token: token.into() })
    }

    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitOutcome, ClientError> {
        let builder = self.http.post(self.endpoint(&["api", "conversions"])?).json(request);
        self.send(builder).await
    }

    pub async fn list(&self, options: &ListOptions) -> Result<Vec<ConversionJob>, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = options.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(status) = options.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(conversion_type) = options.conversion_type {
            query.push(("type", conversion_type.as_str().to_string()));
        }

        let builder = self.http.get(self.endpoint(&["api", "conversions"])?).query(&query);
        let envelope: JobListEnvelope = self.send(builder).await?;
        Ok(envelope.jobs)
    }

    pub async fn get(&self, job_id: &str) -> Result<ConversionJob, ClientError> {
        // Dot segments are dropped by URL normalization and would hit the list route.
        if matches!(job_id, "" | "." | "..") {
            return Err(ClientError::NotFound(format!("Job {job_id:?} not found")));
        }
        let builder = self.http.get(self.endpoint(&["api", "conversions", job_id])?);
        let envelope: JobEnvelope = self.send(builder).await?;
        Ok(envelope.job)
    }

    pub async fn summarize(&self, days: Option<u32>) -> Result<UsageReport, ClientError> {
        let mut builder = self.http.get(self.endpoint(&["api", "usage"])?);
        if let Some(days) = days {
            builder = builder.query(&[("days", days)]);
        }
        let envelope: UsageEnvelope = self.send(builder).await?;
        Ok(UsageReport { summary: envelope.summary, daily_stats: envelope.daily_stats })
    }

    /// Appends path segments to the base URL, percent-encoding each one, so
    /// a job id can never add path components or a query string.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.bearer_auth(&self.token).send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Transport(format!("Unexpected response body: {e}")));
        }

        let envelope = response.json::<ErrorEnvelope>().await.ok();
        Err(map_error_status(status, envelope))
    }
}

fn map_error_status(status: StatusCode, envelope: Option<ErrorEnvelope>) -> ClientError {
    let (message, processing_time_ms) = match envelope {
        Some(envelope) => (envelope.error, envelope.processing_time_ms),
        None => (status.to_string(), None),
    };

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE => ClientError::Rejected(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::UNPROCESSABLE_ENTITY => ClientError::ConversionFailed { message, processing_time_ms },
        s if s.is_server_error() => ClientError::Unavailable(message),
        _ => ClientError::Transport(format!("Unexpected status {status}: {message}")),
    }
}
