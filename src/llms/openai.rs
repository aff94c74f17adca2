//! OpenAI provider.
//!
//! Talks to the chat-completions endpoint over `reqwest`. Structured
//! scoring requests set `response_format: json_object`; image attachments
//! use an `image_url` content part.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::LlmError;
use crate::types::ScoreResult;

use super::{parse_score_json, ScoreRequest, ScoringModel};

/// Default API root for the OpenAI API.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI model client for one agent.
#[derive(Debug, Clone)]
pub struct OpenAiModel {
    model: String,
    name: String,
    temperature: f64,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiModel {
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

    fn request_body(&self, content: Value, json_output: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": content }],
        });
        if json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    async fn invoke(&self, body: &Value) -> Result<String, LlmError> {
        log::debug!(
            "OpenAiModel.invoke: name={} model={}",
            self.name,
            self.model
        );
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

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
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::MalformedResponse {
                detail: "response has no message content".into(),
            })?;
        Ok(content.to_string())
    }
}

#[async_trait]
impl ScoringModel for OpenAiModel {
    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResult, LlmError> {
        log::debug!("scoring request from {} via {}", request.agent, self.model);
        let content = match &request.image_url {
            Some(url) => json!([
                { "type": "text", "text": request.prompt },
                { "type": "image_url", "image_url": { "url": url } },
            ]),
            None => Value::String(request.prompt.clone()),
        };
        let body = self.request_body(content, true);
        let text = self.invoke(&body).await?;
        parse_score_json(&text)
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = self.request_body(Value::String(prompt.to_string()), false);
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
        let content = json!([
            { "type": "text", "text": prompt },
            { "type": "image_url", "image_url": { "url": image_url } },
        ]);
        let body = self.request_body(content, false);
        let text = self.invoke(&body).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model(base_url: &str) -> OpenAiModel {
        OpenAiModel::new(
            "gpt-4o-mini",
            "meta_evaluator",
            0.0,
            "sk-test",
            Duration::from_secs(5),
        )
        .with_base_url(base_url)
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "content": text } }] })
    }

    #[tokio::test]
    async fn score_sends_bearer_and_parses_json_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "```json\n{\"score\": 5, \"comment\": \"limited range of structures\"}\n```",
            )))
            .mount(&server)
            .await;

        let request = ScoreRequest {
            agent: "grammar_agent",
            prompt: "evaluate".into(),
            image_url: None,
        };
        let result = model(&server.uri()).score(&request).await.unwrap();
        assert_eq!(result.band, 5);
        assert!(result.comment.contains("limited range"));
    }

    #[tokio::test]
    async fn client_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = model(&server.uri()).generate("plan").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn empty_generation_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  ")))
            .mount(&server)
            .await;

        let err = model(&server.uri()).generate("plan").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }
}
