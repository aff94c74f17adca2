//! Gap analysis: overall band computation, weak-criterion detection and
//! the consolidated improvement plan.
//!
//! When the target is met the engine short-circuits with a fixed message —
//! no rubric fetches and no generation call happen in that case. When it is
//! not, every weak criterion's rubric snapshot is accumulated first and a
//! single generation call produces one cross-criterion plan.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::descriptors::DescriptorStore;
use crate::error::EvaluationError;
use crate::llms::ScoringModel;
use crate::prompts::{self, TARGET_MET_MESSAGE};
use crate::types::{AggregateState, Criterion, GapAnalysisReport};

/// Overall band across exactly four criterion scores: the average rounded
/// DOWN to the nearest half band, capped at 9.0.
///
/// Rejects inputs that are not exactly four scores and any score outside
/// 0-9.
pub fn overall_band(scores: &[u8]) -> Result<f64, EvaluationError> {
    if scores.len() != 4 {
        return Err(EvaluationError::validation(format!(
            "overall band requires exactly 4 scores, got {}",
            scores.len()
        )));
    }
    if let Some(bad) = scores.iter().find(|s| **s > 9) {
        return Err(EvaluationError::validation(format!(
            "band score must be 0-9, got {bad}"
        )));
    }
    // mean * 2 == sum / 2, so integer division floors to the half band.
    let sum: u32 = scores.iter().map(|s| u32::from(*s)).sum();
    let band = f64::from(sum / 2) / 2.0;
    Ok(band.min(9.0))
}

/// The criteria scoring strictly below the target. Ties at the target are
/// not weak.
pub fn get_weak_bands(scores: &BTreeMap<String, u8>, target: u8) -> BTreeMap<String, u8> {
    scores
        .iter()
        .filter(|(_, score)| **score < target)
        .map(|(name, score)| (name.clone(), *score))
        .collect()
}

/// The gap analysis engine.
#[derive(Debug)]
pub struct GapAnalysisEngine {
    model: Arc<dyn ScoringModel>,
}

impl GapAnalysisEngine {
    /// Build the engine around the plan-generation model.
    pub fn new(model: Arc<dyn ScoringModel>) -> Self {
        Self { model }
    }

    /// Analyse the merged state against the submission's target band.
    ///
    /// Rubric lookup failures abort the evaluation: there is no partial or
    /// degraded gap analysis output.
    pub async fn run(
        &self,
        state: &AggregateState,
        store: &DescriptorStore,
    ) -> Result<GapAnalysisReport, EvaluationError> {
        let category = state.submission.category;
        let target = state.submission.target_band;

        let scores: Vec<u8> = state.band_scores().into_values().collect();
        let overall = overall_band(&scores)?;

        if overall >= f64::from(target) {
            log::debug!(
                "gap_analysis: {} met target {} with {:.1}",
                state.submission.track_id,
                target,
                overall
            );
            return Ok(GapAnalysisReport {
                overall_band: overall,
                met_target: true,
                weak_bands: BTreeMap::new(),
                overall_feedback: TARGET_MET_MESSAGE.to_string(),
                descriptors_used: BTreeMap::new(),
                assessment_criteria_used: BTreeMap::new(),
            });
        }

        // Accumulate every weak criterion's data before generating, so a
        // single call covers all weak areas together.
        let mut weak_bands = BTreeMap::new();
        let mut weak_comments = BTreeMap::new();
        let mut descriptors_used = BTreeMap::new();
        let mut criteria_used = BTreeMap::new();

        for criterion in Criterion::ALL {
            let score = state.score(criterion);
            if score >= target {
                continue;
            }
            let name = criterion.rubric_name(category).to_string();
            weak_bands.insert(name.clone(), score);
            weak_comments.insert(name.clone(), state.comment(criterion).to_string());
            descriptors_used.insert(
                name.clone(),
                store.rubric_text_at_band(category, criterion, target)?,
            );
            criteria_used.insert(
                name,
                store.assessment_criteria_text(category, criterion)?,
            );
        }

        let prompt = prompts::render_gap_analysis(
            overall,
            target,
            &weak_bands,
            &weak_comments,
            &descriptors_used,
            &criteria_used,
        );

        log::debug!(
            "gap_analysis: {} below target {} ({:.1}); {} weak criteria",
            state.submission.track_id,
            target,
            overall,
            weak_bands.len()
        );

        let plan = self
            .model
            .generate(&prompt)
            .await
            .map_err(|source| EvaluationError::Branch {
                branch: "gap_analysis",
                source,
            })?;

        Ok(GapAnalysisReport {
            overall_band: overall,
            met_target: false,
            weak_bands,
            overall_feedback: plan,
            descriptors_used,
            assessment_criteria_used: criteria_used,
        })
    }
}
