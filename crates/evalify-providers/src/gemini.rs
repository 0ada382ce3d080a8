//! Google Gemini recognizer.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use evalify_core::error::RecognitionError;
use evalify_core::model::{DetectedAnswers, SheetImage};
use evalify_core::traits::{
    build_recognition_prompt, build_response_schema, parse_detected_answers, Recognizer,
};

use crate::http;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Recognizer backed by the Gemini `generateContent` endpoint.
///
/// The sheet is sent inline as base64 and the response is constrained to
/// JSON with a schema that lists every question as required.
pub struct GeminiRecognizer {
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl GeminiRecognizer {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: Option<String>,
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
            timeout_secs,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Recognizer for GeminiRecognizer {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, image), fields(model = %self.model, file = %image.file_name))]
    async fn recognize(
        &self,
        image: &SheetImage,
        question_count: u32,
    ) -> Result<DetectedAnswers, RecognitionError> {
        let start = Instant::now();

        let body = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: STANDARD.encode(&image.bytes),
                        },
                    },
                    Part::Text {
                        text: build_recognition_prompt(question_count),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json".to_string(),
                response_schema: build_response_schema(question_count),
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout_secs))?;

        let response = http::check_status(response).await?;

        let api_response: GeminiResponse = response.json().await.map_err(|e| {
            RecognitionError::MalformedResponse(format!("failed to parse response: {e}"))
        })?;

        let text: String = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| {
                RecognitionError::MalformedResponse("response contained no candidates".into())
            })?
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();

        tracing::debug!(
            "gemini responded in {}ms ({} bytes)",
            start.elapsed().as_millis(),
            text.len()
        );

        parse_detected_answers(&text, question_count)
    }
}
