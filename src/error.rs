//! Error types for the essay evaluation service.
//!
//! Each concern carries its own enum; `EvaluationError` is the workflow-level
//! type the orchestrator and HTTP layer see, and classifies which failures
//! the retry policy may repeat.

use thiserror::Error;

/// Errors raised while constructing configuration or LLM clients.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The model name does not map to a known provider.
    #[error("LLM model must start with 'gemini-' or 'gpt-', got '{model}'")]
    UnknownProvider { model: String },

    /// The API key for the selected provider is missing.
    #[error("{key} not found in the environment or settings. Set it before starting the service.")]
    MissingApiKey { key: &'static str },

    /// The API-key file could not be read or parsed.
    #[error("API key file not found or unreadable: {path}")]
    KeyFile { path: String },
}

/// Errors from the rubric data store.
///
/// Lookups are deterministic, so these are never retried.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// No rubric entry for the requested (exam, task, criterion, band) path.
    #[error("descriptor not found for {exam_type} {task} / {criterion}{band_part}", band_part = band_suffix(.band))]
    NotFound {
        exam_type: &'static str,
        task: String,
        criterion: String,
        band: Option<u8>,
    },

    /// The embedded rubric document failed to parse.
    #[error("rubric data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn band_suffix(band: &Option<u8>) -> String {
    match band {
        Some(b) => format!(" band {b}"),
        None => String::new(),
    }
}

/// Errors from the opaque scoring / generation / image calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("LLM transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status from the upstream API.
    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The upstream response could not be parsed into the requested shape.
    #[error("malformed LLM response: {detail}")]
    MalformedResponse { detail: String },

    /// The model returned no usable content.
    #[error("empty response from model '{model}'")]
    EmptyResponse { model: String },
}

/// Workflow-level error for one essay evaluation.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Malformed submission fields, rejected before any workflow execution.
    #[error("invalid submission: {message}")]
    Validation { message: String },

    /// A scoring or generation call failed (possibly after retries).
    #[error("'{branch}' failed: {source}")]
    Branch {
        branch: &'static str,
        #[source]
        source: LlmError,
    },

    /// A rubric lookup failed.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Client construction failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal invariant breakage (should not happen in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl EvaluationError {
    /// Build a validation error from any displayable message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether the retry policy may repeat the failed invocation.
    ///
    /// Transient external failures are retryable; validation and rubric
    /// lookup failures are deterministic and are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Branch { .. })
    }
}
