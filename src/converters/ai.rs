use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ConversionError, ConversionResult};
use crate::config::AiConfig;
use crate::models::payload::{AiCodeInput, AiTextInput, CodeOperation, TextOperation, TextOutput};

/// OpenAI-compatible chat-completions client for text and code operations.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    config: AiConfig,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

fn text_instructions(input: &AiTextInput) -> String {
    let language = input.target_language.as_deref().unwrap_or("English");
    match input.operation {
        TextOperation::Summarize => "Summarize the following text concisely, keeping the key points.".to_string(),
        TextOperation::Rewrite => "Rewrite the following text to improve clarity and flow while keeping its meaning.".to_string(),
        TextOperation::Translate => format!("Translate the following text into {language}. Return only the translation."),
        TextOperation::Grammar => "Correct the grammar, spelling and punctuation of the following text. Return only the corrected text.".to_string(),
        TextOperation::Expand => "Expand the following text with more detail and supporting explanation.".to_string(),
    }
}

fn code_instructions(input: &AiCodeInput) -> String {
    let language = input.language.as_deref().unwrap_or("the given language");
    match input.operation {
        CodeOperation::Explain => format!("Explain what the following code written in {language} does, step by step."),
        CodeOperation::Review => format!("Review the following {language} code. List bugs, risks and concrete improvements."),
        CodeOperation::Convert => {
            let target = input.target_language.as_deref().unwrap_or("Python");
            format!("Convert the following {language} code to {target}. Return only the converted code.")
        }
        CodeOperation::Optimize => format!("Optimize the following {language} code for performance and readability. Return the improved code with brief notes."),
        CodeOperation::Document => format!("Add documentation comments to the following {language} code. Return the documented code."),
    }
}

impl AiClient {
    pub fn new(config: AiConfig) -> ConversionResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConversionError::Upstream(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub async fn process_text(&self, input: &AiTextInput) -> ConversionResult<TextOutput> {
        self.complete(text_instructions(input), input.text.clone()).await
    }

    pub async fn process_code(&self, input: &AiCodeInput) -> ConversionResult<TextOutput> {
        self.complete(code_instructions(input), input.code.clone()).await
    }

    async fn complete(&self, system: String, user: String) -> ConversionResult<TextOutput> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ConversionError::Upstream("AI processing is not configured on this server".to_string())
        })?;

        let request_body = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system".to_string(), content: system },
                ChatMessage { role: "user".to_string(), content: user },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.endpoint))
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConversionError::Timeout("AI service did not respond in time".to_string())
                } else {
                    ConversionError::Upstream(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "AI endpoint returned an error: {body}");
            return Err(ConversionError::Upstream(format!("AI endpoint returned HTTP {status}")));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ConversionError::Upstream(format!("Malformed AI response: {e}")))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ConversionError::Upstream("AI response contained no text".to_string()))?;

        info!(chars = text.len(), "AI completion received");

        Ok(TextOutput {
            text,
            model: completion.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}
