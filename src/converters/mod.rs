pub mod ai;
pub mod currency;
pub mod pdf;
pub mod units;

use async_trait::async_trait;
use std::fmt;

use crate::models::payload::{ConversionInput, ConversionOutput};

pub use ai::AiClient;
pub use pdf::PdfToolkit;

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// Well-formed request the delegate cannot honour (unknown unit, currency...).
    Unsupported(String),
    /// External tool exited unsuccessfully or produced no output.
    Tool(String),
    Timeout(String),
    /// AI endpoint unreachable, misconfigured, or answered with an error.
    Upstream(String),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::Unsupported(msg) => write!(f, "{msg}"),
            ConversionError::Tool(msg) => write!(f, "Conversion tool failed: {msg}"),
            ConversionError::Timeout(msg) => write!(f, "Conversion timed out: {msg}"),
            ConversionError::Upstream(msg) => write!(f, "AI service error: {msg}"),
        }
    }
}

impl std::error::Error for ConversionError {}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// Performs one conversion. Implementations hold no per-request state.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, input: &ConversionInput) -> ConversionResult<ConversionOutput>;
}

/// Routes each input variant to its delegate.
pub struct ConversionEngine {
    pdf: PdfToolkit,
    ai: AiClient,
}

impl ConversionEngine {
    pub fn new(pdf: PdfToolkit, ai: AiClient) -> Self {
        Self { pdf, ai }
    }
}

#[async_trait]
impl Converter for ConversionEngine {
    async fn convert(&self, input: &ConversionInput) -> ConversionResult<ConversionOutput> {
        match input {
            ConversionInput::Currency(input) => currency::convert(input).map(ConversionOutput::Currency),
            ConversionInput::Unit(input) => units::convert(input).map(ConversionOutput::Unit),
            ConversionInput::DocumentToPdf(file) => self.pdf.document_to_pdf(file).await.map(ConversionOutput::File),
            ConversionInput::PdfCompress { file, quality } => {
                self.pdf.compress(file, *quality).await.map(ConversionOutput::File)
            }
            ConversionInput::PdfMerge(files) => self.pdf.merge(files).await.map(ConversionOutput::File),
            ConversionInput::AiText(input) => self.ai.process_text(input).await.map(ConversionOutput::Text),
            ConversionInput::AiCode(input) => self.ai.process_code(input).await.map(ConversionOutput::Text),
        }
    }
}
