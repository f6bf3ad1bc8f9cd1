use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::ExtractionError;
use crate::config::ExtractionConfig;

/// Instruction sent with every planner photo.
pub const EXTRACTION_PROMPT: &str = "Extract the daily plan from this photo of a handwritten \
planner page: tasks, schedule, meals (breakfast, lunch, dinner, snacks), water intake, mood, \
weather and notes. Answer with a single JSON object with the keys: todos (array of strings), \
schedule (array of objects with \"time\" as zero-padded HH:MM and \"description\"), breakfast, \
lunch, dinner, snacks, water_intake_glasses (number), mood, weather, notes, high_level_note. \
If a field is not found, use an empty string, an empty array, or 0 for water intake.";

pub struct PlanImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

/// Reads a planner photo and returns the model's raw text answer.
#[async_trait]
pub trait PlanExtractor: Send + Sync {
    async fn extract_text(&self, image: &PlanImage) -> Result<String, ExtractionError>;
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiExtractor {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiExtractor {
    pub fn new(config: &ExtractionConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build extraction http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl PlanExtractor for GeminiExtractor {
    #[instrument(skip_all, fields(model = %self.model, bytes = image.bytes.len()))]
    async fn extract_text(&self, image: &PlanImage) -> Result<String, ExtractionError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": EXTRACTION_PROMPT },
                    { "inline_data": {
                        "mime_type": image.mime_type,
                        "data": STANDARD.encode(&image.bytes),
                    }}
                ]
            }]
        });

        let res = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Transport(e.without_url().to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let message = res
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").into());
            warn!(%status, %message, "extraction service error");
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = res
            .json()
            .await
            .map_err(|e| ExtractionError::Transport(e.without_url().to_string()))?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyResponse);
        }
        debug!(chars = text.len(), "extraction text received");
        Ok(text)
    }
}

/// Extractor with a canned answer.
#[cfg(test)]
pub struct ScriptedExtractor(pub Result<String, ExtractionError>);

#[cfg(test)]
#[async_trait]
impl PlanExtractor for ScriptedExtractor {
    async fn extract_text(&self, _image: &PlanImage) -> Result<String, ExtractionError> {
        self.0.clone()
    }
}
