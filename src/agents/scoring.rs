//! Generic criterion scoring agent for grammar, lexical resource and
//! coherence.
//!
//! One agent makes exactly one structured scoring call; any failure
//! propagates to the workflow's retry policy — the agent itself never
//! retries.

use std::sync::Arc;

use crate::descriptors::DescriptorStore;
use crate::error::EvaluationError;
use crate::llms::{ScoreRequest, ScoringModel};
use crate::prompts::{self, EvaluationContext, MISSING_PARAGRAPH_RULE, SHORT_RESPONSE_RULE};
use crate::types::{Criterion, ScoreResult, Submission};

/// Scoring agent for one of the three text-only criteria.
#[derive(Debug)]
pub struct CriterionAgent {
    criterion: Criterion,
    model: Arc<dyn ScoringModel>,
}

impl CriterionAgent {
    /// Build an agent for a criterion. The task criterion has its own agent
    /// type; this one covers grammar, lexical and coherence.
    pub fn new(criterion: Criterion, model: Arc<dyn ScoringModel>) -> Self {
        debug_assert!(
            criterion != Criterion::Task,
            "the task criterion is scored by TaskAgent"
        );
        Self { criterion, model }
    }

    /// The criterion this agent scores.
    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    /// Produce the [`ScoreResult`] for this agent's criterion.
    pub async fn evaluate(
        &self,
        submission: &Submission,
        store: &DescriptorStore,
    ) -> Result<ScoreResult, EvaluationError> {
        let category = submission.category;
        let band_descriptors = store.rubric_text(category, self.criterion)?;
        let assessment_criteria = store.assessment_criteria_text(category, self.criterion)?;
        let task_description = store.task_description(category)?;
        let notes = self.criterion_notes(&submission.essay);

        let prompt = prompts::render_evaluation(&EvaluationContext {
            criterion_name: self.criterion.rubric_name(category),
            essay: &submission.essay,
            question: &submission.question,
            task_description: &task_description,
            assessment_criteria: &assessment_criteria,
            band_descriptors: &band_descriptors,
            notes: &notes,
        });

        log::debug!(
            "{}: scoring essay {} with {}",
            self.criterion.branch_name(),
            submission.track_id,
            self.model.model()
        );

        self.model
            .score(&ScoreRequest {
                agent: self.criterion.branch_name(),
                prompt,
                image_url: None,
            })
            .await
            .map_err(|source| EvaluationError::Branch {
                branch: self.criterion.branch_name(),
                source,
            })
    }

    /// Fixed scoring rules for this criterion. Every length-sensitive agent
    /// carries the short-response rule; coherence also checks for the
    /// complete absence of paragraph breaks.
    fn criterion_notes(&self, essay: &str) -> String {
        let mut notes = vec![SHORT_RESPONSE_RULE];
        if self.criterion == Criterion::Coherence && !essay.contains('\n') {
            notes.push(MISSING_PARAGRAPH_RULE);
        }
        notes.join("\n")
    }
}
