//! # IELTS Essay Grader
//!
//! Evaluation service for IELTS essay submissions. Four LLM-backed scoring
//! agents (grammar, lexical resource, coherence, task) run in parallel from
//! a single fan-out point; a fan-in barrier merges their results, gap
//! analysis computes the overall band against the student's target, and an
//! optional meta-evaluation side channel audits the quality of the produced
//! feedback.
//!
//! The library is transport-agnostic: [`flow::EvaluationFlow`] is the core
//! API, and [`server`] wraps it in an axum HTTP surface.

pub mod agents;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod flow;
pub mod gap_analysis;
pub mod llms;
pub mod prompts;
pub mod server;
pub mod types;

pub use config::Settings;
pub use descriptors::DescriptorStore;
pub use error::{ConfigError, DescriptorError, EvaluationError, LlmError};
pub use flow::{EvaluationFlow, RetryPolicy};
pub use gap_analysis::{get_weak_bands, overall_band, GapAnalysisEngine};
pub use types::{
    AggregateState, Criterion, EssayCategory, EvaluationReport, ExamType, GapAnalysisReport,
    ScoreResult, Submission,
};

/// Library version.
pub const VERSION: &str = "2.0.0";
