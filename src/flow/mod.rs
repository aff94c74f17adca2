//! The central evaluation workflow.
//!
//! One evaluation fans out to the four scoring agents in parallel, waits at
//! the fan-in barrier for every branch to complete, merges the results by
//! explicit field assignment, optionally forks the meta-evaluation side
//! channel, and finishes with gap analysis:
//!
//! ```text
//! START ──┬─► grammar_eval ───┐
//!         ├─► lexical_eval ───┤
//!         ├─► task_eval ──────┼─► aggregate ─┬─► gap_analysis ─► END
//!         └─► coherence_eval ─┘              └─► meta_evaluation (detached)
//! ```
//!
//! Failure is all-or-nothing: if any branch raises after its retries are
//! exhausted, the whole evaluation fails and no partial result is returned.

pub mod retry;

use std::sync::Arc;

use crate::agents::{
    CriterionAgent, ImageDescriptionStep, ImageProbe, MetaEvaluator, TaskAgent, TaskEvaluation,
};
use crate::config::Settings;
use crate::descriptors::DescriptorStore;
use crate::error::EvaluationError;
use crate::gap_analysis::GapAnalysisEngine;
use crate::llms::build_model;
use crate::types::{AggregateState, Criterion, EvaluationReport, Submission};

pub use retry::RetryPolicy;

/// The orchestrator for essay evaluations.
///
/// Construction wires every agent with its injected model client; nothing
/// is initialized at import time. One instance serves concurrent
/// evaluations — per-submission state lives entirely inside
/// [`evaluate`](Self::evaluate).
#[derive(Debug)]
pub struct EvaluationFlow {
    store: Arc<DescriptorStore>,
    grammar: CriterionAgent,
    lexical: CriterionAgent,
    coherence: CriterionAgent,
    task: TaskAgent,
    gap: GapAnalysisEngine,
    meta: Option<Arc<MetaEvaluator>>,
    retry: RetryPolicy,
}

impl EvaluationFlow {
    /// Build the full workflow from settings.
    ///
    /// Per-agent temperatures: deterministic scoring agents run cold
    /// (0.0-0.2); the improvement-plan generator runs at 0.5 for more
    /// natural teacher-style prose.
    pub fn from_settings(settings: &Settings) -> Result<Self, EvaluationError> {
        let keys = &settings.api_keys;
        let timeout = settings.llm_timeout;
        let models = &settings.models;

        let grammar_model = build_model(&models.grammar, "grammar_agent", 0.0, keys, timeout)?;
        let lexical_model = build_model(&models.lexical, "lexical_agent", 0.2, keys, timeout)?;
        let coherence_model =
            build_model(&models.coherence, "coherence_agent", 0.1, keys, timeout)?;
        let task_model = build_model(&models.task, "task_agent", 0.1, keys, timeout)?;
        let image_model =
            build_model(&models.image, "image_description_agent", 0.0, keys, timeout)?;
        let overall_model = build_model(&models.overall, "overall_agent", 0.5, keys, timeout)?;

        let image_step = ImageDescriptionStep::new(
            image_model,
            ImageProbe::new(settings.image_check_timeout),
        );

        let meta = if settings.eval_monitoring {
            let meta_model = build_model(&models.meta, "meta_evaluator", 0.0, keys, timeout)?;
            Some(Arc::new(MetaEvaluator::new(
                meta_model,
                settings.evaluations_dir.clone(),
            )))
        } else {
            None
        };

        Ok(Self {
            store: Arc::new(DescriptorStore::embedded_copy()?),
            grammar: CriterionAgent::new(Criterion::Grammar, grammar_model),
            lexical: CriterionAgent::new(Criterion::Lexical, lexical_model),
            coherence: CriterionAgent::new(Criterion::Coherence, coherence_model),
            task: TaskAgent::new(task_model, image_step),
            gap: GapAnalysisEngine::new(overall_model),
            meta,
            retry: RetryPolicy::new(settings.max_attempts),
        })
    }

    /// Build a workflow from preconstructed parts (used by tests and by
    /// callers that inject their own model clients).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        store: Arc<DescriptorStore>,
        grammar: CriterionAgent,
        lexical: CriterionAgent,
        coherence: CriterionAgent,
        task: TaskAgent,
        gap: GapAnalysisEngine,
        meta: Option<Arc<MetaEvaluator>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            grammar,
            lexical,
            coherence,
            task,
            gap,
            meta,
            retry,
        }
    }

    /// Run one full evaluation.
    pub async fn evaluate(
        &self,
        submission: Submission,
    ) -> Result<EvaluationReport, EvaluationError> {
        log::info!(
            "evaluation started: track_id={} category={}",
            submission.track_id,
            submission.category.label()
        );
        let store = self.store.as_ref();

        // Fan out. The join is the fan-in barrier: it waits for all four
        // branches even when one of them has already failed.
        let (grammar, lexical, coherence, task) = tokio::join!(
            self.retry.run(Criterion::Grammar.branch_name(), |_| self
                .grammar
                .evaluate(&submission, store)),
            self.retry.run(Criterion::Lexical.branch_name(), |_| self
                .lexical
                .evaluate(&submission, store)),
            self.retry.run(Criterion::Coherence.branch_name(), |_| self
                .coherence
                .evaluate(&submission, store)),
            self.retry.run(Criterion::Task.branch_name(), |_| self
                .task
                .evaluate(&submission, store)),
        );

        let grammar = grammar?;
        let lexical = lexical?;
        let coherence = coherence?;
        let TaskEvaluation {
            result: task,
            image_description,
        } = task?;

        // Aggregate: disjoint fields, plain assignment, no computation.
        let mut state = AggregateState::merge(
            submission,
            grammar,
            coherence,
            lexical,
            task,
            image_description,
        );

        // Independent terminal branch; never gates the response. It sees
        // the pre-gap-analysis state, like the parallel branch it is.
        if let Some(meta) = &self.meta {
            let meta = Arc::clone(meta);
            let store = Arc::clone(&self.store);
            let snapshot = state.clone();
            let retry = self.retry;
            tokio::spawn(async move {
                let outcome = retry
                    .run("meta_evaluation", |_| meta.evaluate(&snapshot, &store))
                    .await;
                if let Err(err) = outcome {
                    log::error!(
                        "meta evaluation failed for {}: {err}",
                        snapshot.submission.track_id
                    );
                }
            });
        }

        let gap = self
            .retry
            .run("gap_analysis", |_| self.gap.run(&state, store))
            .await?;
        state.overall_feedback = gap.overall_feedback.clone();

        log::info!(
            "evaluation finished: track_id={} overall_band={:.1} met_target={}",
            state.submission.track_id,
            gap.overall_band,
            gap.met_target
        );

        Ok(EvaluationReport::assemble(&state, &gap))
    }
}
