use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ConversionConfig;
use crate::error::{AppError, AppResult};
use crate::models::job::ConversionType;
use crate::models::payload::{
    AiCodeInput, AiTextInput, CompressionQuality, ConversionInput, CurrencyInput, FileInput,
    SubmitRequest, UnitInput,
};

const MAX_FILE_NAME_LENGTH: usize = 255;
const MAX_TAG_LENGTH: usize = 64;
const MAX_MERGE_FILES: usize = 50;

#[derive(Deserialize)]
struct CompressOptions {
    #[serde(default)]
    quality: CompressionQuality,
}

#[derive(Deserialize)]
struct MergeFile {
    file_name: String,
    file_data: String,
}

#[derive(Deserialize)]
struct MergeOptions {
    files: Vec<MergeFile>,
}

/// Turns a raw submission into a typed [`ConversionInput`]. Everything
/// rejected here is a validation error and never reaches the job store.
#[derive(Clone)]
pub struct RequestValidator {
    max_file_size_bytes: usize,
    max_text_length: usize,
}

impl RequestValidator {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            max_file_size_bytes: (config.max_file_size_mb as usize) * 1024 * 1024,
            max_text_length: config.max_text_length,
        }
    }

    pub fn parse_submission(&self, request: SubmitRequest) -> AppResult<ConversionInput> {
        let tag = request.conversion_type.trim();
        if tag.is_empty() {
            return Err(AppError::Validation("conversion_type is required".to_string()));
        }
        self.validate_input(tag, "conversion_type", MAX_TAG_LENGTH)?;
        let conversion_type: ConversionType = tag.parse().map_err(AppError::Validation)?;

        let has_file = request.file_data.is_some() || request.file_name.is_some();
        if request.input_data.is_none() && !has_file {
            return Err(AppError::Validation(
                "Either input_data or file_data with file_name is required".to_string(),
            ));
        }

        match conversion_type {
            ConversionType::CurrencyConvert => {
                let input: CurrencyInput = typed(request.input_data, conversion_type)?;
                if !input.amount.is_finite() || input.amount < 0.0 {
                    return Err(AppError::Validation("amount must be a non-negative number".to_string()));
                }
                validate_currency_code(&input.from_currency, "from_currency")?;
                validate_currency_code(&input.to_currency, "to_currency")?;
                Ok(ConversionInput::Currency(input))
            }
            ConversionType::UnitConvert => {
                let input: UnitInput = typed(request.input_data, conversion_type)?;
                if !input.value.is_finite() {
                    return Err(AppError::Validation("value must be a finite number".to_string()));
                }
                self.validate_input(&input.category, "category", MAX_TAG_LENGTH)?;
                self.validate_input(&input.from_unit, "from_unit", MAX_TAG_LENGTH)?;
                self.validate_input(&input.to_unit, "to_unit", MAX_TAG_LENGTH)?;
                Ok(ConversionInput::Unit(input))
            }
            ConversionType::DocumentToPdf => {
                let file = self.top_level_file(&request)?;
                Ok(ConversionInput::DocumentToPdf(file))
            }
            ConversionType::PdfCompress => {
                let file = self.top_level_file(&request)?;
                let options: CompressOptions = match request.input_data {
                    Some(data) if !data.is_null() => typed(Some(data), conversion_type)?,
                    _ => CompressOptions { quality: CompressionQuality::default() },
                };
                Ok(ConversionInput::PdfCompress { file, quality: options.quality })
            }
            ConversionType::PdfMerge => {
                let options: MergeOptions = typed(request.input_data, conversion_type)?;
                if options.files.len() < 2 {
                    return Err(AppError::Validation("pdf_merge needs at least two files".to_string()));
                }
                if options.files.len() > MAX_MERGE_FILES {
                    return Err(AppError::Validation(format!(
                        "pdf_merge accepts at most {MAX_MERGE_FILES} files"
                    )));
                }
                let mut total = 0usize;
                let mut files = Vec::with_capacity(options.files.len());
                for file in options.files {
                    let file = self.file(&file.file_name, &file.file_data)?;
                    total += file.bytes.len();
                    files.push(file);
                }
                if total > self.max_file_size_bytes {
                    return Err(AppError::Validation(format!(
                        "Combined file size of {total} bytes exceeds the limit of {} bytes",
                        self.max_file_size_bytes
                    )));
                }
                Ok(ConversionInput::PdfMerge(files))
            }
            ConversionType::AiText => {
                let input: AiTextInput = typed(request.input_data, conversion_type)?;
                self.validate_prompt(&input.text, "text")?;
                Ok(ConversionInput::AiText(input))
            }
            ConversionType::AiCode => {
                let input: AiCodeInput = typed(request.input_data, conversion_type)?;
                self.validate_prompt(&input.code, "code")?;
                Ok(ConversionInput::AiCode(input))
            }
        }
    }

    /// Length, null byte and control character checks for short fields.
    pub fn validate_input(&self, input: &str, field_name: &str, max_length: usize) -> AppResult<()> {
        if input.len() > max_length {
            return Err(AppError::Validation(format!(
                "{} too long: {} characters (max: {})",
                field_name, input.len(), max_length
            )));
        }

        if input.contains('\0') {
            return Err(AppError::Validation(format!("{field_name} contains null bytes")));
        }

        if input.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
            return Err(AppError::Validation(format!(
                "{field_name} contains invalid control characters"
            )));
        }

        Ok(())
    }

    pub fn validate_file_name(&self, file_name: &str) -> AppResult<()> {
        if file_name.trim().is_empty() {
            return Err(AppError::Validation("file_name is required".to_string()));
        }
        self.validate_input(file_name, "file_name", MAX_FILE_NAME_LENGTH)?;

        if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") || file_name.starts_with('.') {
            return Err(AppError::Validation("Invalid file_name".to_string()));
        }

        Ok(())
    }

    fn validate_prompt(&self, text: &str, field_name: &str) -> AppResult<()> {
        if text.trim().is_empty() {
            return Err(AppError::Validation(format!("{field_name} must not be empty")));
        }
        let length = text.chars().count();
        if length > self.max_text_length {
            return Err(AppError::Validation(format!(
                "{field_name} too long: {length} characters (max: {})",
                self.max_text_length
            )));
        }
        if text.contains('\0') {
            return Err(AppError::Validation(format!("{field_name} contains null bytes")));
        }
        Ok(())
    }

    fn top_level_file(&self, request: &SubmitRequest) -> AppResult<FileInput> {
        match (&request.file_name, &request.file_data) {
            (Some(name), Some(data)) => self.file(name, data),
            _ => Err(AppError::Validation("file_data and file_name are both required".to_string())),
        }
    }

    fn file(&self, file_name: &str, file_data: &str) -> AppResult<FileInput> {
        self.validate_file_name(file_name)?;

        // Browsers hand over data URLs: "data:application/pdf;base64,JVBER..."
        let encoded = match file_data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => file_data,
        };

        let max_encoded = self.max_file_size_bytes.div_ceil(3) * 4 + 4;
        if encoded.len() > max_encoded {
            return Err(AppError::Validation(format!(
                "{file_name} exceeds the limit of {} bytes",
                self.max_file_size_bytes
            )));
        }

        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::Validation(format!("file_data is not valid base64: {e}")))?;

        if bytes.is_empty() {
            return Err(AppError::Validation(format!("{file_name} is empty")));
        }
        if bytes.len() > self.max_file_size_bytes {
            return Err(AppError::Validation(format!(
                "{file_name} exceeds the limit of {} bytes",
                self.max_file_size_bytes
            )));
        }

        Ok(FileInput { file_name: file_name.to_string(), bytes })
    }
}

fn typed<T: DeserializeOwned>(input_data: Option<Value>, conversion_type: ConversionType) -> AppResult<T> {
    let data = input_data.ok_or_else(|| {
        AppError::Validation(format!("input_data is required for {conversion_type}"))
    })?;
    serde_json::from_value(data)
        .map_err(|e| AppError::Validation(format!("Invalid input_data for {conversion_type}: {e}")))
}

fn validate_currency_code(code: &str, field_name: &str) -> AppResult<()> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!(
            "{field_name} must be a three-letter currency code"
        )));
    }
    Ok(())
}
