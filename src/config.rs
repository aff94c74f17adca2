//! Service configuration.
//!
//! All environment access happens in [`Settings::from_env`]; everything
//! downstream receives an explicitly constructed `Settings` by injection.
//! There is no import-time client initialization: the server binary builds
//! the settings, the settings build the flow, and teardown is the drop of
//! those values.

use std::path::PathBuf;
use std::time::Duration;

/// API keys for the model providers.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Key for `gemini-*` models.
    pub gemini: Option<String>,
    /// Key for `gpt-*` models.
    pub openai: Option<String>,
}

/// Which model each agent uses. Every agent may run on a different model.
#[derive(Debug, Clone)]
pub struct ModelAssignments {
    /// Grammatical Range & Accuracy scoring model.
    pub grammar: String,
    /// Lexical Resource scoring model.
    pub lexical: String,
    /// Coherence & Cohesion scoring model.
    pub coherence: String,
    /// Task Achievement / Task Response scoring model.
    pub task: String,
    /// Image description model.
    pub image: String,
    /// Improvement-plan generation model.
    pub overall: String,
    /// Meta-evaluation model.
    pub meta: String,
}

impl Default for ModelAssignments {
    fn default() -> Self {
        Self {
            grammar: "gemini-2.0-flash".into(),
            lexical: "gemini-2.0-flash".into(),
            coherence: "gemini-2.0-flash".into(),
            task: "gemini-2.0-flash".into(),
            image: "gemini-2.0-flash".into(),
            overall: "gemini-2.0-flash".into(),
            meta: "gpt-4o-mini".into(),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Per-agent model names.
    pub models: ModelAssignments,
    /// Provider API keys.
    pub api_keys: ApiKeys,
    /// Whether the meta-evaluation side channel is scheduled at all.
    pub eval_monitoring: bool,
    /// Directory for meta-evaluation report files.
    pub evaluations_dir: PathBuf,
    /// CSV file mapping API keys to user names for the HTTP surface.
    pub api_keys_file: PathBuf,
    /// Bind address for the HTTP server.
    pub bind_addr: String,
    /// Environment label shown by the status endpoint.
    pub environment: String,
    /// Timeout for the image HEAD probe.
    pub image_check_timeout: Duration,
    /// Timeout for each LLM request.
    pub llm_timeout: Duration,
    /// Total attempts (including the first) per scoring branch.
    pub max_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models: ModelAssignments::default(),
            api_keys: ApiKeys::default(),
            eval_monitoring: false,
            evaluations_dir: PathBuf::from("evaluations"),
            api_keys_file: PathBuf::from("user_keys.csv"),
            bind_addr: "0.0.0.0:8080".into(),
            environment: "development".into(),
            image_check_timeout: Duration::from_secs(5),
            llm_timeout: Duration::from_secs(120),
            max_attempts: 5,
        }
    }
}

impl Settings {
    /// Read settings from the environment. This is the only place the
    /// process environment is consulted.
    ///
    /// Recognized variables: `GRAMMAR_MODEL`, `LEXICAL_MODEL`,
    /// `COHERENCE_MODEL`, `TASK_MODEL`, `IMAGE_MODEL`, `OVERALL_MODEL`,
    /// `EVAL_MODEL`, `GEMINI_API_KEY`, `OPENAI_API_KEY`, `EVAL_MONITORING`,
    /// `EVALUATIONS_DIR`, `API_KEYS_FILE`, `PORT`, `ELA_ENV`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let models = ModelAssignments {
            grammar: var("GRAMMAR_MODEL").unwrap_or(defaults.models.grammar),
            lexical: var("LEXICAL_MODEL").unwrap_or(defaults.models.lexical),
            coherence: var("COHERENCE_MODEL").unwrap_or(defaults.models.coherence),
            task: var("TASK_MODEL").unwrap_or(defaults.models.task),
            image: var("IMAGE_MODEL").unwrap_or(defaults.models.image),
            overall: var("OVERALL_MODEL").unwrap_or(defaults.models.overall),
            meta: var("EVAL_MODEL").unwrap_or(defaults.models.meta),
        };

        let port = var("PORT").unwrap_or_else(|| "8080".into());

        Self {
            models,
            api_keys: ApiKeys {
                gemini: var("GEMINI_API_KEY"),
                openai: var("OPENAI_API_KEY"),
            },
            eval_monitoring: var("EVAL_MONITORING")
                .map(|v| truthy(&v))
                .unwrap_or(false),
            evaluations_dir: var("EVALUATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.evaluations_dir),
            api_keys_file: var("API_KEYS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.api_keys_file),
            bind_addr: format!("0.0.0.0:{port}"),
            environment: var("ELA_ENV").unwrap_or(defaults.environment),
            image_check_timeout: defaults.image_check_timeout,
            llm_timeout: defaults.llm_timeout,
            max_attempts: defaults.max_attempts,
        }
    }
}

/// Truthy-string parse for flag variables: true/1/yes/y, case-insensitive.
fn truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_accepts_the_documented_spellings() {
        for v in ["true", "TRUE", "1", "yes", "Y", "y"] {
            assert!(truthy(v), "{v} should be truthy");
        }
        for v in ["false", "0", "no", "on", ""] {
            assert!(!truthy(v), "{v} should be falsy");
        }
    }

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.image_check_timeout, Duration::from_secs(5));
        assert!(!settings.eval_monitoring);
    }
}
