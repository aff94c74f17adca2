//! Google Gemini provider.
//!
//! Talks to the `generateContent` endpoint over `reqwest`. Structured
//! scoring requests use the JSON response mime type so the model returns a
//! parseable object; image attachments are passed as file parts.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::LlmError;
use crate::types::ScoreResult;

use super::{parse_score_json, ScoreRequest, ScoringModel};

/// Default API root for the Gemini API.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini model client for one agent.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    model: String,
    name: String,
    temperature: f64,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiModel {
    /// Create a client for an agent.
    pub fn new(
        model: impl Into<String>,
        name: impl Into<String>,
        temperature: f64,
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            model: model.into(),
            name: name.into(),
            temperature,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        }
    }

    /// Override the API root (tests point this at a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn request_body(&self, parts: Vec<Value>, json_output: bool) -> Value {
        let mut generation_config = json!({ "temperature": self.temperature });
        if json_output {
            generation_config["responseMimeType"] = Value::String("application/json".into());
        }
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation_config,
        })
    }

    async fn invoke(&self, body: &Value) -> Result<String, LlmError> {
        log::debug!(
            "GeminiModel.invoke: name={} model={}",
            self.name,
            self.model
        );
        let response = self.client.post(self.endpoint()).json(body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: Value = serde_json::from_str(&text).map_err(|e| LlmError::MalformedResponse {
            detail: format!("invalid JSON envelope: {e}"),
        })?;
        let content = parsed
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::MalformedResponse {
                detail: "response has no candidate text".into(),
            })?;
        Ok(content.to_string())
    }
}

#[async_trait]
impl ScoringModel for GeminiModel {
    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResult, LlmError> {
        log::debug!("scoring request from {} via {}", request.agent, self.model);
        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some(url) = &request.image_url {
            parts.push(json!({ "fileData": { "fileUri": url } }));
        }
        let body = self.request_body(parts, true);
        let content = self.invoke(&body).await?;
        parse_score_json(&content)
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = self.request_body(vec![json!({ "text": prompt })], false);
        let content = self.invoke(&body).await?;
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse {
                model: self.model.clone(),
            });
        }
        Ok(content)
    }

    async fn describe_image(
        &self,
        prompt: &str,
        image_url: &str,
    ) -> Result<Option<String>, LlmError> {
        let parts = vec![
            json!({ "text": prompt }),
            json!({ "fileData": { "fileUri": image_url } }),
        ];
        let body = self.request_body(parts, false);
        let content = self.invoke(&body).await?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(trimmed.to_string()))
    }
}
