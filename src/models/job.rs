use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Forward-only: nothing leaves a terminal state, nothing moves back.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    CurrencyConvert,
    UnitConvert,
    DocumentToPdf,
    PdfCompress,
    PdfMerge,
    AiText,
    AiCode,
}

impl ConversionType {
    pub const ALL: [ConversionType; 7] = [
        ConversionType::CurrencyConvert,
        ConversionType::UnitConvert,
        ConversionType::DocumentToPdf,
        ConversionType::PdfCompress,
        ConversionType::PdfMerge,
        ConversionType::AiText,
        ConversionType::AiCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionType::CurrencyConvert => "currency_convert",
            ConversionType::UnitConvert => "unit_convert",
            ConversionType::DocumentToPdf => "document_to_pdf",
            ConversionType::PdfCompress => "pdf_compress",
            ConversionType::PdfMerge => "pdf_merge",
            ConversionType::AiText => "ai_text",
            ConversionType::AiCode => "ai_code",
        }
    }
}

impl FromStr for ConversionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConversionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unsupported conversion type: {s}"))
    }
}

impl fmt::Display for ConversionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversionJob {
    pub id: String,
    pub owner: String,
    pub conversion_type: ConversionType,
    pub status: JobStatus,
    pub input_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    pub fn new(owner: String, conversion_type: ConversionType, input_data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner,
            conversion_type,
            status: JobStatus::Pending,
            input_data,
            output_data: None,
            error_message: None,
            processing_time_ms: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "Illegal status transition for job {}: {} -> {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn start_processing(&mut self) -> AppResult<()> {
        self.transition(JobStatus::Processing)
    }

    pub fn mark_completed(&mut self, output: Value, elapsed: Duration) -> AppResult<()> {
        self.transition(JobStatus::Completed)?;
        self.output_data = Some(output);
        self.finish(elapsed);
        Ok(())
    }

    pub fn mark_failed(&mut self, error: String, elapsed: Duration) -> AppResult<()> {
        self.transition(JobStatus::Failed)?;
        self.error_message = Some(error);
        self.finish(elapsed);
        Ok(())
    }

    fn finish(&mut self, elapsed: Duration) {
        self.processing_time_ms = Some(elapsed.as_millis() as i64);
        self.completed_at = Some(Utc::now());
    }
}
