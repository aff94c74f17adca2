//! Core data model for one essay evaluation.
//!
//! Everything that crosses the workflow is an explicitly-fielded struct:
//! the validated [`Submission`], one [`ScoreResult`] per criterion, the
//! merged [`AggregateState`], and the boundary reports. Criterion-to-field
//! resolution goes through [`Criterion`] and `match`, never string keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;

/// Default overall feedback before gap analysis has run.
pub const FEEDBACK_NOT_GENERATED: &str = "Overall Feedback Not Generated";

// ---------------------------------------------------------------------------
// Exam taxonomy
// ---------------------------------------------------------------------------

/// IELTS exam variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamType {
    /// General Training writing test.
    GeneralTraining,
    /// Academic writing test.
    Academic,
}

impl ExamType {
    /// The name used as the top-level key of the rubric documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::GeneralTraining => "General Training",
            ExamType::Academic => "Academic",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four writing-task variants, identified at the HTTP boundary
/// by the integer codes 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EssayCategory {
    /// General Training Writing Task 1 (code 1).
    GeneralTask1,
    /// General Training Writing Task 2 (code 2).
    GeneralTask2,
    /// Academic Writing Task 1 (code 3).
    AcademicTask1,
    /// Academic Writing Task 2 (code 4).
    AcademicTask2,
}

impl EssayCategory {
    /// The wire code for this category.
    pub fn code(&self) -> u8 {
        match self {
            EssayCategory::GeneralTask1 => 1,
            EssayCategory::GeneralTask2 => 2,
            EssayCategory::AcademicTask1 => 3,
            EssayCategory::AcademicTask2 => 4,
        }
    }

    /// The exam variant this category belongs to.
    pub fn exam_type(&self) -> ExamType {
        match self {
            EssayCategory::GeneralTask1 | EssayCategory::GeneralTask2 => {
                ExamType::GeneralTraining
            }
            EssayCategory::AcademicTask1 | EssayCategory::AcademicTask2 => ExamType::Academic,
        }
    }

    /// Writing task number (1 or 2).
    pub fn task_number(&self) -> u8 {
        match self {
            EssayCategory::GeneralTask1 | EssayCategory::AcademicTask1 => 1,
            EssayCategory::GeneralTask2 | EssayCategory::AcademicTask2 => 2,
        }
    }

    /// Key of the task section inside the rubric documents ("Task 1"/"Task 2").
    pub fn task_key(&self) -> &'static str {
        match self.task_number() {
            1 => "Task 1",
            _ => "Task 2",
        }
    }

    /// Human-readable label, e.g. "Academic Writing Task 1".
    pub fn label(&self) -> &'static str {
        match self {
            EssayCategory::GeneralTask1 => "General Training Writing Task 1",
            EssayCategory::GeneralTask2 => "General Training Writing Task 2",
            EssayCategory::AcademicTask1 => "Academic Writing Task 1",
            EssayCategory::AcademicTask2 => "Academic Writing Task 2",
        }
    }
}

impl TryFrom<u8> for EssayCategory {
    type Error = EvaluationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(EssayCategory::GeneralTask1),
            2 => Ok(EssayCategory::GeneralTask2),
            3 => Ok(EssayCategory::AcademicTask1),
            4 => Ok(EssayCategory::AcademicTask2),
            other => Err(EvaluationError::validation(format!(
                "essay category must be 1-4, got {other}"
            ))),
        }
    }
}

impl From<EssayCategory> for u8 {
    fn from(category: EssayCategory) -> u8 {
        category.code()
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// The four fixed assessment dimensions.
///
/// Replaces the reflection-style criterion-to-field mapping with an
/// enumerated lookup: every score/comment accessor resolves through a
/// `match` on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Criterion {
    /// Task Achievement (Task 1) / Task Response (Task 2).
    Task,
    /// Coherence & Cohesion.
    Coherence,
    /// Lexical Resource.
    Lexical,
    /// Grammatical Range & Accuracy.
    Grammar,
}

impl Criterion {
    /// All four criteria, in rubric order.
    pub const ALL: [Criterion; 4] = [
        Criterion::Task,
        Criterion::Coherence,
        Criterion::Lexical,
        Criterion::Grammar,
    ];

    /// The rubric name for this criterion. The task criterion is named by
    /// the task number: "Task Achievement" for Task 1, "Task Response" for
    /// Task 2.
    pub fn rubric_name(&self, category: EssayCategory) -> &'static str {
        match self {
            Criterion::Task => match category.task_number() {
                1 => "Task Achievement",
                _ => "Task Response",
            },
            Criterion::Coherence => "Coherence & Cohesion",
            Criterion::Lexical => "Lexical Resource",
            Criterion::Grammar => "Grammatical Range & Accuracy",
        }
    }

    /// Stable branch name used in logs and retry reporting.
    pub fn branch_name(&self) -> &'static str {
        match self {
            Criterion::Task => "task_eval",
            Criterion::Coherence => "coherence_eval",
            Criterion::Lexical => "lexical_eval",
            Criterion::Grammar => "grammar_eval",
        }
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// One essay submission, validated at ingress and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Tracking id for the request (opaque, at least 3 characters).
    pub track_id: String,
    /// The essay question.
    pub question: String,
    /// The essay text under evaluation.
    pub essay: String,
    /// Which writing task this essay answers.
    pub category: EssayCategory,
    /// Target band score selected by the student (1-9).
    pub target_band: u8,
    /// Optional URL of the visual for Academic Writing Task 1.
    pub image_url: Option<String>,
    /// Optional pre-supplied description of that visual.
    pub image_description: Option<String>,
}

impl Submission {
    /// Validate and build a submission. All field invariants are enforced
    /// here, before any workflow execution.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        track_id: impl Into<String>,
        question: impl Into<String>,
        essay: impl Into<String>,
        category: EssayCategory,
        target_band: u8,
        image_url: Option<String>,
        image_description: Option<String>,
    ) -> Result<Self, EvaluationError> {
        let track_id = track_id.into();
        let question = question.into();
        let essay = essay.into();

        if track_id.trim().len() < 3 {
            return Err(EvaluationError::validation(
                "track_id must be at least 3 characters",
            ));
        }
        if question.trim().is_empty() {
            return Err(EvaluationError::validation("question must not be empty"));
        }
        if essay.trim().is_empty() {
            return Err(EvaluationError::validation("essay must not be empty"));
        }
        if !(1..=9).contains(&target_band) {
            return Err(EvaluationError::validation(format!(
                "target band must be 1-9, got {target_band}"
            )));
        }

        Ok(Self {
            track_id,
            question,
            essay,
            category,
            target_band,
            image_url,
            image_description,
        })
    }
}

// ---------------------------------------------------------------------------
// Score results
// ---------------------------------------------------------------------------

/// One criterion's band score and examiner comment. Produced exactly once
/// by the owning scoring agent and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Band score, 0-9.
    pub band: u8,
    /// Examiner-style comment explaining the score.
    pub comment: String,
}

impl ScoreResult {
    /// Validate and build a score result.
    pub fn new(band: u8, comment: impl Into<String>) -> Result<Self, EvaluationError> {
        let comment = comment.into();
        if band > 9 {
            return Err(EvaluationError::validation(format!(
                "band score must be 0-9, got {band}"
            )));
        }
        if comment.trim().len() < 3 {
            return Err(EvaluationError::validation(
                "score comment must not be empty",
            ));
        }
        Ok(Self { band, comment })
    }
}

// ---------------------------------------------------------------------------
// Aggregate state
// ---------------------------------------------------------------------------

/// The merged state of one evaluation after the fan-in barrier.
///
/// Each scoring branch contributes exactly one disjoint field, so the merge
/// is plain field assignment with no conflict resolution. The type has no
/// optional score slots: it cannot be constructed until all four branches
/// have completed.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateState {
    /// The originating submission.
    pub submission: Submission,
    /// Grammatical Range & Accuracy result.
    pub grammar: ScoreResult,
    /// Coherence & Cohesion result.
    pub coherence: ScoreResult,
    /// Lexical Resource result.
    pub lexical: ScoreResult,
    /// Task Achievement / Task Response result.
    pub task: ScoreResult,
    /// Image description resolved by the task branch (possibly absent).
    pub image_description: Option<String>,
    /// Overall feedback; defaulted until gap analysis runs.
    pub overall_feedback: String,
}

impl AggregateState {
    /// Merge the four branch results with the submission.
    pub fn merge(
        submission: Submission,
        grammar: ScoreResult,
        coherence: ScoreResult,
        lexical: ScoreResult,
        task: ScoreResult,
        image_description: Option<String>,
    ) -> Self {
        Self {
            submission,
            grammar,
            coherence,
            lexical,
            task,
            image_description,
            overall_feedback: FEEDBACK_NOT_GENERATED.to_string(),
        }
    }

    /// The band score awarded for a criterion.
    pub fn score(&self, criterion: Criterion) -> u8 {
        match criterion {
            Criterion::Grammar => self.grammar.band,
            Criterion::Coherence => self.coherence.band,
            Criterion::Lexical => self.lexical.band,
            Criterion::Task => self.task.band,
        }
    }

    /// The comment recorded for a criterion.
    pub fn comment(&self, criterion: Criterion) -> &str {
        match criterion {
            Criterion::Grammar => &self.grammar.comment,
            Criterion::Coherence => &self.coherence.comment,
            Criterion::Lexical => &self.lexical.comment,
            Criterion::Task => &self.task.comment,
        }
    }

    /// All four scores keyed by criterion, in rubric order.
    pub fn band_scores(&self) -> BTreeMap<Criterion, u8> {
        Criterion::ALL.iter().map(|c| (*c, self.score(*c))).collect()
    }
}

// ---------------------------------------------------------------------------
// Gap analysis report
// ---------------------------------------------------------------------------

/// Output of the gap analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapAnalysisReport {
    /// Half-band-rounded-down average of the four criterion scores.
    pub overall_band: f64,
    /// Whether the overall band meets or exceeds the target.
    pub met_target: bool,
    /// Criteria scoring strictly below the target, keyed by rubric name.
    pub weak_bands: BTreeMap<String, u8>,
    /// The generated improvement plan (or the fixed congratulation).
    pub overall_feedback: String,
    /// Target-band descriptor snapshot per weak criterion, for audit.
    pub descriptors_used: BTreeMap<String, String>,
    /// Assessment-criteria snapshot per weak criterion, for audit.
    pub assessment_criteria_used: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Boundary report
// ---------------------------------------------------------------------------

/// The evaluation result returned to the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Tracking id of the submission.
    pub track_id: String,
    /// Grammatical Range & Accuracy band score.
    pub grammar_score: u8,
    /// Grammatical Range & Accuracy comment.
    pub grammar_comment: String,
    /// Coherence & Cohesion band score.
    pub coherence_score: u8,
    /// Coherence & Cohesion comment.
    pub coherence_comment: String,
    /// Lexical Resource band score.
    pub lexical_score: u8,
    /// Lexical Resource comment.
    pub lexical_comment: String,
    /// Task Achievement / Task Response band score.
    pub task_score: u8,
    /// Task Achievement / Task Response comment.
    pub task_comment: String,
    /// Resolved image description, if any.
    pub image_description: Option<String>,
    /// Overall band across the four criteria.
    pub overall_band: f64,
    /// Whether the target band was met.
    pub met_target: bool,
    /// Criteria below target with their scores.
    pub weak_bands: BTreeMap<String, u8>,
    /// Improvement plan or congratulation message.
    pub overall_feedback: String,
}

impl EvaluationReport {
    /// Assemble the boundary report from the merged state and the gap
    /// analysis output.
    pub fn assemble(state: &AggregateState, gap: &GapAnalysisReport) -> Self {
        Self {
            track_id: state.submission.track_id.clone(),
            grammar_score: state.grammar.band,
            grammar_comment: state.grammar.comment.clone(),
            coherence_score: state.coherence.band,
            coherence_comment: state.coherence.comment.clone(),
            lexical_score: state.lexical.band,
            lexical_comment: state.lexical.comment.clone(),
            task_score: state.task.band,
            task_comment: state.task.comment.clone(),
            image_description: state.image_description.clone(),
            overall_band: gap.overall_band,
            met_target: gap.met_target,
            weak_bands: gap.weak_bands.clone(),
            overall_feedback: gap.overall_feedback.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Meta evaluation report
// ---------------------------------------------------------------------------

/// Summary block of the meta evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaSummary {
    /// Overall quality of the produced feedback, normalized 0-1.
    pub overall_quality: f64,
    /// Up to three strengths of the feedback.
    #[serde(default)]
    pub key_strengths: Vec<String>,
    /// Up to three weaknesses of the feedback.
    #[serde(default)]
    pub key_weaknesses: Vec<String>,
    /// Up to three suggested improvements.
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
}

/// Quality metrics for the produced feedback, parsed from the meta model's
/// JSON output. Dimension metrics are normalized 0-1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaEvaluationReport {
    /// Task-understanding accuracy metrics.
    pub task_accuracy: BTreeMap<String, f64>,
    /// Grammar feedback quality metrics.
    #[serde(alias = "grammar_eval_qualy")]
    pub grammar_evaluation_quality: BTreeMap<String, f64>,
    /// Lexical feedback quality metrics.
    #[serde(alias = "lexical_eval_qualy")]
    pub lexical_evaluation_quality: BTreeMap<String, f64>,
    /// Coherence feedback quality metrics.
    #[serde(alias = "coherence_eval_qualy")]
    pub coherence_evaluation_quality: BTreeMap<String, f64>,
    /// Overall feedback quality metrics.
    #[serde(alias = "feedback_qualy")]
    pub feedback_quality: BTreeMap<String, f64>,
    /// Cross-dimension summary.
    pub meta_summary: MetaSummary,
    /// Tracking id of the evaluated submission.
    pub track_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(band: u8) -> ScoreResult {
        ScoreResult::new(band, "solid control with occasional slips").unwrap()
    }

    fn submission() -> Submission {
        Submission::new(
            "trk-001",
            "Some people think museums should be free.",
            "Museums are important cultural institutions. They should be free to all.",
            EssayCategory::GeneralTask2,
            7,
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn category_codes_round_trip() {
        for code in 1..=4u8 {
            let category = EssayCategory::try_from(code).unwrap();
            assert_eq!(category.code(), code);
        }
        assert!(EssayCategory::try_from(0).is_err());
        assert!(EssayCategory::try_from(5).is_err());
    }

    #[test]
    fn category_maps_to_exam_and_task() {
        assert_eq!(
            EssayCategory::GeneralTask1.exam_type(),
            ExamType::GeneralTraining
        );
        assert_eq!(EssayCategory::AcademicTask2.exam_type(), ExamType::Academic);
        assert_eq!(EssayCategory::AcademicTask1.task_number(), 1);
        assert_eq!(EssayCategory::GeneralTask2.task_number(), 2);
    }

    #[test]
    fn task_criterion_name_follows_task_number() {
        assert_eq!(
            Criterion::Task.rubric_name(EssayCategory::AcademicTask1),
            "Task Achievement"
        );
        assert_eq!(
            Criterion::Task.rubric_name(EssayCategory::AcademicTask2),
            "Task Response"
        );
        assert_eq!(
            Criterion::Grammar.rubric_name(EssayCategory::GeneralTask1),
            "Grammatical Range & Accuracy"
        );
    }

    #[test]
    fn submission_rejects_malformed_fields() {
        assert!(Submission::new(
            "ab",
            "q",
            "essay",
            EssayCategory::GeneralTask2,
            7,
            None,
            None
        )
        .is_err());
        assert!(Submission::new(
            "trk-001",
            "",
            "essay",
            EssayCategory::GeneralTask2,
            7,
            None,
            None
        )
        .is_err());
        assert!(Submission::new(
            "trk-001",
            "q",
            "   ",
            EssayCategory::GeneralTask2,
            7,
            None,
            None
        )
        .is_err());
        assert!(Submission::new(
            "trk-001",
            "q",
            "essay",
            EssayCategory::GeneralTask2,
            0,
            None,
            None
        )
        .is_err());
        assert!(Submission::new(
            "trk-001",
            "q",
            "essay",
            EssayCategory::GeneralTask2,
            10,
            None,
            None
        )
        .is_err());
    }

    #[test]
    fn score_result_bounds() {
        assert!(ScoreResult::new(9, "excellent throughout").is_ok());
        assert!(ScoreResult::new(10, "excellent throughout").is_err());
        assert!(ScoreResult::new(5, "").is_err());
    }

    #[test]
    fn aggregate_accessors_resolve_by_criterion() {
        let state = AggregateState::merge(
            submission(),
            score(6),
            score(7),
            score(8),
            score(5),
            None,
        );
        assert_eq!(state.score(Criterion::Grammar), 6);
        assert_eq!(state.score(Criterion::Coherence), 7);
        assert_eq!(state.score(Criterion::Lexical), 8);
        assert_eq!(state.score(Criterion::Task), 5);
        assert_eq!(state.overall_feedback, FEEDBACK_NOT_GENERATED);

        let scores = state.band_scores();
        assert_eq!(scores.len(), 4);
        assert_eq!(scores[&Criterion::Task], 5);
    }
}
