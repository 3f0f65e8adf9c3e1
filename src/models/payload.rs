//! Typed conversion payloads.
//!
//! Requests arrive as loosely shaped JSON and are validated into
//! [`ConversionInput`]; delegates answer with a [`ConversionOutput`].
//! Both know how to render an audit form for the job store, which
//! records file sizes instead of file contents.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::job::ConversionType;

/// Raw request body for `POST /api/conversions`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub conversion_type: String,
    #[serde(default)]
    pub input_data: Option<Value>,
    #[serde(default)]
    pub file_data: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CurrencyInput {
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UnitInput {
    pub category: String,
    pub value: f64,
    pub from_unit: String,
    pub to_unit: String,
}

#[derive(Clone, PartialEq)]
pub struct FileInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FileInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileInput")
            .field("file_name", &self.file_name)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

impl FileInput {
    fn audit(&self) -> Value {
        json!({ "file_name": self.file_name, "size_bytes": self.bytes.len() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionQuality {
    Screen,
    #[default]
    Ebook,
    Printer,
    Prepress,
}

impl CompressionQuality {
    /// Ghostscript `-dPDFSETTINGS` value.
    pub fn pdf_settings(&self) -> &'static str {
        match self {
            CompressionQuality::Screen => "/screen",
            CompressionQuality::Ebook => "/ebook",
            CompressionQuality::Printer => "/printer",
            CompressionQuality::Prepress => "/prepress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOperation {
    Summarize,
    Rewrite,
    Translate,
    Grammar,
    Expand,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AiTextInput {
    pub operation: TextOperation,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeOperation {
    Explain,
    Review,
    Convert,
    Optimize,
    Document,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AiCodeInput {
    pub operation: CodeOperation,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionInput {
    Currency(CurrencyInput),
    Unit(UnitInput),
    DocumentToPdf(FileInput),
    PdfCompress { file: FileInput, quality: CompressionQuality },
    PdfMerge(Vec<FileInput>),
    AiText(AiTextInput),
    AiCode(AiCodeInput),
}

impl ConversionInput {
    pub fn conversion_type(&self) -> ConversionType {
        match self {
            ConversionInput::Currency(_) => ConversionType::CurrencyConvert,
            ConversionInput::Unit(_) => ConversionType::UnitConvert,
            ConversionInput::DocumentToPdf(_) => ConversionType::DocumentToPdf,
            ConversionInput::PdfCompress { .. } => ConversionType::PdfCompress,
            ConversionInput::PdfMerge(_) => ConversionType::PdfMerge,
            ConversionInput::AiText(_) => ConversionType::AiText,
            ConversionInput::AiCode(_) => ConversionType::AiCode,
        }
    }

    /// The form persisted as the job's `input_data`.
    pub fn audit_payload(&self) -> Value {
        match self {
            ConversionInput::Currency(input) => json!(input),
            ConversionInput::Unit(input) => json!(input),
            ConversionInput::DocumentToPdf(file) => file.audit(),
            ConversionInput::PdfCompress { file, quality } => {
                let mut audit = file.audit();
                audit["quality"] = json!(quality);
                audit
            }
            ConversionInput::PdfMerge(files) => {
                json!({ "files": files.iter().map(FileInput::audit).collect::<Vec<_>>() })
            }
            ConversionInput::AiText(input) => json!(input),
            ConversionInput::AiCode(input) => json!(input),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyOutput {
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
    pub exchange_rate: f64,
    pub converted_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutput {
    pub category: String,
    pub value: f64,
    pub from_unit: String,
    pub to_unit: String,
    pub converted_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutput {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    /// Base64 (standard alphabet).
    pub file_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOutput {
    pub text: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConversionOutput {
    Currency(CurrencyOutput),
    Unit(UnitOutput),
    File(FileOutput),
    Text(TextOutput),
}

impl ConversionOutput {
    /// The form persisted as the job's `output_data`.
    pub fn audit_payload(&self) -> Value {
        match self {
            ConversionOutput::File(file) => json!({
                "file_name": file.file_name,
                "content_type": file.content_type,
                "size_bytes": file.size_bytes,
            }),
            other => json!(other),
        }
    }
}
