//! OpenAI-compatible vision recognizer.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use evalify_core::error::RecognitionError;
use evalify_core::model::{DetectedAnswers, SheetImage};
use evalify_core::traits::{build_recognition_prompt, parse_detected_answers, Recognizer};

use crate::http;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const SYSTEM_PROMPT: &str = "You read OMR answer sheets. Respond ONLY with the requested JSON object.";

/// Recognizer for any endpoint speaking the chat completions protocol with
/// image inputs.
pub struct OpenAiRecognizer {
    api_key: String,
    base_url: String,
    model: String,
    org_id: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiRecognizer {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: Option<String>,
        org_id: Option<String>,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            org_id,
            timeout_secs,
            client,
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    temperature: f64,
    response_format: ResponseFormat,
    messages: Vec<OpenAiMessage>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Recognizer for OpenAiRecognizer {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, image), fields(model = %self.model, file = %image.file_name))]
    async fn recognize(
        &self,
        image: &SheetImage,
        question_count: u32,
    ) -> Result<DetectedAnswers, RecognitionError> {
        let start = Instant::now();

        let data_url = format!(
            "data:{};base64,{}",
            image.mime_type,
            STANDARD.encode(&image.bytes)
        );

        let body = OpenAiRequest {
            model: self.model.clone(),
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: vec![ContentPart::Text {
                        text: SYSTEM_PROMPT.to_string(),
                    }],
                },
                OpenAiMessage {
                    role: "user",
                    content: vec![
                        ContentPart::Text {
                            text: build_recognition_prompt(question_count),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: data_url },
                        },
                    ],
                },
            ],
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout_secs))?;

        let response = http::check_status(response).await?;

        let api_response: OpenAiResponse = response.json().await.map_err(|e| {
            RecognitionError::MalformedResponse(format!("failed to parse response: {e}"))
        })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                RecognitionError::MalformedResponse("response contained no message content".into())
            })?;

        tracing::debug!(
            "openai responded in {}ms ({} bytes)",
            start.elapsed().as_millis(),
            content.len()
        );

        parse_detected_answers(&content, question_count)
    }
}
