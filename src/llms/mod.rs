//! The opaque model seam: structured scoring, free-text generation and
//! image description.
//!
//! The workflow sees only [`ScoringModel`]; concrete providers live in
//! [`gemini`] and [`openai`] and are chosen by model-name prefix. Providers
//! never retry — the workflow's retry policy owns repetition.

pub mod gemini;
pub mod openai;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::config::ApiKeys;
use crate::error::{ConfigError, LlmError};
use crate::types::ScoreResult;

pub use gemini::GeminiModel;
pub use openai::OpenAiModel;

/// One structured scoring request.
#[derive(Debug, Clone)]
pub struct ScoreRequest {
    /// Name of the requesting agent, for logs.
    pub agent: &'static str,
    /// The fully rendered evaluation prompt.
    pub prompt: String,
    /// Image to attach, for the image-aware task evaluation.
    pub image_url: Option<String>,
}

/// Raw structured output of a scoring call, before validation.
#[derive(Debug, Deserialize)]
pub struct RawScore {
    /// Band score as returned by the model.
    pub score: i64,
    /// Examiner comment as returned by the model.
    pub comment: String,
}

impl RawScore {
    /// Validate the raw output into a [`ScoreResult`].
    ///
    /// Out-of-range or empty output is a malformed response, which the
    /// retry policy treats as transient — models occasionally produce it.
    pub fn into_score_result(self) -> Result<ScoreResult, LlmError> {
        let band = u8::try_from(self.score).map_err(|_| LlmError::MalformedResponse {
            detail: format!("score {} is not a valid band", self.score),
        })?;
        ScoreResult::new(band, self.comment).map_err(|e| LlmError::MalformedResponse {
            detail: e.to_string(),
        })
    }
}

/// Abstract model interface used by every agent.
#[async_trait]
pub trait ScoringModel: Send + Sync + fmt::Debug {
    /// The model identifier (e.g. "gemini-2.0-flash").
    fn model(&self) -> &str;

    /// The agent name this client was built for.
    fn name(&self) -> &str;

    /// Make one structured scoring call. Malformed upstream output is
    /// [`LlmError::MalformedResponse`].
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResult, LlmError>;

    /// Make one free-text generation call.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Describe an image. `Ok(None)` means the model declined to describe.
    async fn describe_image(
        &self,
        prompt: &str,
        image_url: &str,
    ) -> Result<Option<String>, LlmError>;
}

/// Build a model client for an agent, dispatching on the model-name prefix:
/// `gemini-*` or `gpt-*`. Anything else, or a missing key for the selected
/// provider, is a configuration error.
pub fn build_model(
    model: &str,
    name: &str,
    temperature: f64,
    keys: &ApiKeys,
    timeout: std::time::Duration,
) -> Result<Arc<dyn ScoringModel>, ConfigError> {
    if model.starts_with("gemini-") {
        let key = keys
            .gemini
            .clone()
            .ok_or(ConfigError::MissingApiKey { key: "GEMINI_API_KEY" })?;
        Ok(Arc::new(GeminiModel::new(model, name, temperature, key, timeout)))
    } else if model.starts_with("gpt-") {
        let key = keys
            .openai
            .clone()
            .ok_or(ConfigError::MissingApiKey { key: "OPENAI_API_KEY" })?;
        Ok(Arc::new(OpenAiModel::new(model, name, temperature, key, timeout)))
    } else {
        Err(ConfigError::UnknownProvider {
            model: model.to_string(),
        })
    }
}

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^```(?:json)?\s*").expect("fence regex"));

/// Strip markdown code fences from model output before JSON parsing.
/// Models wrap JSON in ``` fences often enough that parsing the raw text
/// directly would misclassify good responses as malformed.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text.trim(), "").trim().to_string()
}

/// Parse a structured score out of (possibly fenced) model text.
pub fn parse_score_json(text: &str) -> Result<ScoreResult, LlmError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(LlmError::MalformedResponse {
            detail: "empty response content".into(),
        });
    }
    let raw: RawScore =
        serde_json::from_str(&cleaned).map_err(|e| LlmError::MalformedResponse {
            detail: format!("{e}: {}", cleaned.chars().take(200).collect::<String>()),
        })?;
    raw.into_score_result()
}
