//! Meta evaluation of feedback quality (side channel).
//!
//! Judges the four agents' comments and the overall feedback against the
//! rubric for each awarded band, then persists the result as a timestamped
//! JSON report. Runs detached from the response path: its failure is
//! logged, never surfaced.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::descriptors::DescriptorStore;
use crate::error::EvaluationError;
use crate::llms::{strip_code_fences, ScoringModel};
use crate::prompts::{self, MetaEvaluationContext};
use crate::types::{AggregateState, Criterion, MetaEvaluationReport};

/// Fallback text when a rubric lookup for an awarded band has no entry
/// (band 0 essays). The side channel keeps going where gap analysis
/// would abort.
const DESCRIPTOR_UNAVAILABLE: &str = "Descriptor not found for given parameters.";

/// Feedback-quality evaluator.
#[derive(Debug)]
pub struct MetaEvaluator {
    model: Arc<dyn ScoringModel>,
    reports_dir: PathBuf,
}

impl MetaEvaluator {
    /// Build the evaluator around a model and a report directory.
    pub fn new(model: Arc<dyn ScoringModel>, reports_dir: PathBuf) -> Self {
        Self { model, reports_dir }
    }

    /// Evaluate the produced feedback and write the report file.
    pub async fn evaluate(
        &self,
        state: &AggregateState,
        store: &DescriptorStore,
    ) -> Result<MetaEvaluationReport, EvaluationError> {
        let category = state.submission.category;
        let at_band = |criterion: Criterion| {
            store
                .rubric_text_at_band(category, criterion, state.score(criterion))
                .unwrap_or_else(|_| DESCRIPTOR_UNAVAILABLE.to_string())
        };

        let task_description = store.task_description(category)?;
        let assessment_criteria = store.all_assessment_criteria_text(category)?;

        let prompt = prompts::render_meta_evaluation(&MetaEvaluationContext {
            track_id: &state.submission.track_id,
            essay: &state.submission.essay,
            question: &state.submission.question,
            grammar_comment: &state.grammar.comment,
            lexical_comment: &state.lexical.comment,
            coherence_comment: &state.coherence.comment,
            task_comment: &state.task.comment,
            overall_feedback: &state.overall_feedback,
            task_description: &task_description,
            assessment_criteria: &assessment_criteria,
            descriptors_grammar: &at_band(Criterion::Grammar),
            descriptors_lexical: &at_band(Criterion::Lexical),
            descriptors_coherence: &at_band(Criterion::Coherence),
            descriptors_task: &at_band(Criterion::Task),
        });

        let response = self
            .model
            .generate(&prompt)
            .await
            .map_err(|source| EvaluationError::Branch {
                branch: "meta_evaluation",
                source,
            })?;

        let cleaned = strip_code_fences(&response);
        let report: MetaEvaluationReport =
            serde_json::from_str(&cleaned).map_err(|e| EvaluationError::Branch {
                branch: "meta_evaluation",
                source: crate::error::LlmError::MalformedResponse {
                    detail: format!("meta evaluation output did not parse: {e}"),
                },
            })?;

        // Report persistence must not fail the side channel either.
        if let Err(err) = self.write_report(&report, state) {
            log::warn!(
                "could not persist meta evaluation for {}: {err}",
                state.submission.track_id
            );
        }

        Ok(report)
    }

    /// Write `meta_eval_<track>_<timestamp>.json` into the reports
    /// directory.
    fn write_report(
        &self,
        report: &MetaEvaluationReport,
        state: &AggregateState,
    ) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.reports_dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("meta_eval_{}_{timestamp}.json", state.submission.track_id);
        let path = self.reports_dir.join(filename);

        let document = json!({
            "evaluation": report,
            "state": state,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
        log::info!("meta evaluation saved to {}", path.display());
        Ok(())
    }
}
