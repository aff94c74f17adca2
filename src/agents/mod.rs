//! Scoring agents and their supporting steps.
//!
//! Four agents score one criterion each; the task agent additionally owns
//! image resolution and the word-count penalty note. The meta evaluator is
//! the optional feedback-quality side channel.

pub mod image;
pub mod meta_eval;
pub mod scoring;
pub mod task;
pub mod word_count;

pub use image::{ImageDescriptionStep, ImageProbe};
pub use meta_eval::MetaEvaluator;
pub use scoring::CriterionAgent;
pub use task::{TaskAgent, TaskEvaluation};
