//! Rubric data store: band descriptors and key assessment criteria.
//!
//! The four source documents (Academic/General Training × descriptors/
//! criteria) ship embedded in the binary and are parsed once. All lookups
//! are read-only and safe for concurrent use; an unknown (category,
//! criterion, band) path is a [`DescriptorError::NotFound`], which callers
//! treat as fatal — the data is static, so retrying cannot help.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;
use crate::types::{Criterion, EssayCategory, ExamType};

/// Embedded Academic band descriptors.
const ACADEMIC_DESCRIPTORS_JSON: &str = include_str!("data/ielts_descriptors_academic.json");
/// Embedded General Training band descriptors.
const GENERAL_DESCRIPTORS_JSON: &str = include_str!("data/ielts_descriptors_general.json");
/// Embedded Academic assessment criteria.
const ACADEMIC_CRITERIA_JSON: &str =
    include_str!("data/ielts_assessment_criteria_academic.json");
/// Embedded General Training assessment criteria.
const GENERAL_CRITERIA_JSON: &str = include_str!("data/ielts_assessment_criteria_general.json");

// ---------------------------------------------------------------------------
// Document shapes
// ---------------------------------------------------------------------------

/// Descriptor entry for one criterion at one band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandDescriptor {
    /// Overall positive qualities expected at this band.
    pub common_descriptor: String,
    /// Exam-variant specific requirements; missing these may lower a rating.
    pub specific_descriptor: String,
    /// Negative features that limit a rating.
    pub critical_negative_features: String,
}

/// Band number ("1".."9") → descriptor.
type BandMap = BTreeMap<String, BandDescriptor>;

/// Criterion name → band map.
type CriterionBands = BTreeMap<String, BandMap>;

/// Task key ("Task 1"/"Task 2") → criterion bands, per exam type.
#[derive(Debug, Deserialize)]
struct DescriptorDocument(BTreeMap<String, BTreeMap<String, CriterionBands>>);

/// Assessment bullet lists for one criterion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriterionAssessment {
    /// Core IELTS writing standards for the criterion.
    #[serde(default)]
    pub common_assessment: Vec<String>,
    /// Requirements unique to the exam variant.
    #[serde(default)]
    pub specific_assessment: Vec<String>,
}

/// Assessment criteria for one task type.
#[derive(Debug, Deserialize)]
struct TaskCriteria {
    word_requirement: u32,
    description: String,
    #[serde(flatten)]
    criteria: BTreeMap<String, CriterionAssessment>,
}

/// Assessment criteria for one exam variant.
#[derive(Debug, Deserialize)]
struct ExamCriteria {
    #[serde(rename = "Task 1")]
    task1: TaskCriteria,
    #[serde(rename = "Task 2")]
    task2: TaskCriteria,
    penalties: Vec<String>,
    #[allow(dead_code)]
    weighting: String,
}

#[derive(Debug, Deserialize)]
struct CriteriaDocument(BTreeMap<String, ExamCriteria>);

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Parsed rubric data for both exam variants.
#[derive(Debug)]
pub struct DescriptorStore {
    academic_descriptors: BTreeMap<String, CriterionBands>,
    general_descriptors: BTreeMap<String, CriterionBands>,
    academic_criteria: ExamCriteria,
    general_criteria: ExamCriteria,
}

/// Process-wide store built from the embedded documents.
static EMBEDDED: Lazy<DescriptorStore> = Lazy::new(|| {
    DescriptorStore::from_documents(
        ACADEMIC_DESCRIPTORS_JSON,
        GENERAL_DESCRIPTORS_JSON,
        ACADEMIC_CRITERIA_JSON,
        GENERAL_CRITERIA_JSON,
    )
    .expect("embedded rubric documents must parse")
});

impl DescriptorStore {
    /// The store backed by the embedded documents.
    pub fn embedded() -> &'static DescriptorStore {
        &EMBEDDED
    }

    /// An owned store parsed from the embedded documents, for callers that
    /// need shared ownership rather than the process-wide instance.
    pub fn embedded_copy() -> Result<Self, DescriptorError> {
        Self::from_documents(
            ACADEMIC_DESCRIPTORS_JSON,
            GENERAL_DESCRIPTORS_JSON,
            ACADEMIC_CRITERIA_JSON,
            GENERAL_CRITERIA_JSON,
        )
    }

    /// Parse a store from the four raw JSON documents.
    pub fn from_documents(
        academic_descriptors: &str,
        general_descriptors: &str,
        academic_criteria: &str,
        general_criteria: &str,
    ) -> Result<Self, DescriptorError> {
        let mut academic: DescriptorDocument = serde_json::from_str(academic_descriptors)?;
        let mut general: DescriptorDocument = serde_json::from_str(general_descriptors)?;
        let mut academic_crit: CriteriaDocument = serde_json::from_str(academic_criteria)?;
        let mut general_crit: CriteriaDocument = serde_json::from_str(general_criteria)?;

        let take_exam = |doc: &mut DescriptorDocument,
                         exam: ExamType|
         -> Result<BTreeMap<String, CriterionBands>, DescriptorError> {
            doc.0.remove(exam.as_str()).ok_or(DescriptorError::NotFound {
                exam_type: exam.as_str(),
                task: "<document root>".into(),
                criterion: String::new(),
                band: None,
            })
        };
        let take_criteria =
            |doc: &mut CriteriaDocument, exam: ExamType| -> Result<ExamCriteria, DescriptorError> {
                doc.0.remove(exam.as_str()).ok_or(DescriptorError::NotFound {
                    exam_type: exam.as_str(),
                    task: "<document root>".into(),
                    criterion: String::new(),
                    band: None,
                })
            };

        Ok(Self {
            academic_descriptors: take_exam(&mut academic, ExamType::Academic)?,
            general_descriptors: take_exam(&mut general, ExamType::GeneralTraining)?,
            academic_criteria: take_criteria(&mut academic_crit, ExamType::Academic)?,
            general_criteria: take_criteria(&mut general_crit, ExamType::GeneralTraining)?,
        })
    }

    fn descriptors_for(&self, exam: ExamType) -> &BTreeMap<String, CriterionBands> {
        match exam {
            ExamType::Academic => &self.academic_descriptors,
            ExamType::GeneralTraining => &self.general_descriptors,
        }
    }

    fn criteria_for(&self, exam: ExamType) -> &ExamCriteria {
        match exam {
            ExamType::Academic => &self.academic_criteria,
            ExamType::GeneralTraining => &self.general_criteria,
        }
    }

    fn task_criteria(&self, category: EssayCategory) -> &TaskCriteria {
        let exam = self.criteria_for(category.exam_type());
        match category.task_number() {
            1 => &exam.task1,
            _ => &exam.task2,
        }
    }

    fn not_found(category: EssayCategory, criterion: &str, band: Option<u8>) -> DescriptorError {
        DescriptorError::NotFound {
            exam_type: category.exam_type().as_str(),
            task: category.task_key().to_string(),
            criterion: criterion.to_string(),
            band,
        }
    }

    fn criterion_bands(
        &self,
        category: EssayCategory,
        criterion: Criterion,
    ) -> Result<(&'static str, &BandMap), DescriptorError> {
        let name = criterion.rubric_name(category);
        let exam = self.descriptors_for(category.exam_type());
        let bands = exam
            .get(category.task_key())
            .and_then(|task| task.get(name))
            .ok_or_else(|| Self::not_found(category, name, None))?;
        Ok((name, bands))
    }

    // -----------------------------------------------------------------------
    // Band descriptor lookups
    // -----------------------------------------------------------------------

    /// All band descriptors for one criterion, wrapped in the standard
    /// framing text used by the scoring prompts.
    pub fn rubric_text(
        &self,
        category: EssayCategory,
        criterion: Criterion,
    ) -> Result<String, DescriptorError> {
        let (name, bands) = self.criterion_bands(category, criterion)?;
        let body = serde_json::to_string_pretty(bands)?;
        Ok(Self::frame_descriptor(category, name, &body))
    }

    /// Descriptors for one criterion at one band. Used by gap analysis to
    /// show what the target band requires, and by the meta evaluator to
    /// show what the awarded band requires.
    pub fn rubric_text_at_band(
        &self,
        category: EssayCategory,
        criterion: Criterion,
        band: u8,
    ) -> Result<String, DescriptorError> {
        let (name, bands) = self.criterion_bands(category, criterion)?;
        let descriptor = bands
            .get(&band.to_string())
            .ok_or_else(|| Self::not_found(category, name, Some(band)))?;
        let body = serde_json::to_string_pretty(descriptor)?;
        Ok(Self::frame_descriptor(
            category,
            &format!("{name} - Band {band}"),
            &body,
        ))
    }

    fn frame_descriptor(category: EssayCategory, descriptor_name: &str, body: &str) -> String {
        format!(
            "An essay must fully fit the positive features of the descriptor at a particular level.\n\
             \n\
             - \"common_descriptor\": describes the overall positive qualities expected at this band.\n\
             - \"specific_descriptor\": requirements specific to the {exam} writing test; missing these may lower the rating.\n\
             - \"critical_negative_features\": negative features that will limit a rating.\n\
             \n\
             Here are the band score descriptors for {exam} - {task}:\n\
             \n\
             {name}: {body}\n",
            exam = category.exam_type(),
            task = category.task_key(),
            name = descriptor_name,
            body = body,
        )
    }

    // -----------------------------------------------------------------------
    // Assessment criteria lookups
    // -----------------------------------------------------------------------

    /// Common and specific assessment points for one criterion.
    pub fn assessment_criteria_text(
        &self,
        category: EssayCategory,
        criterion: Criterion,
    ) -> Result<String, DescriptorError> {
        let name = criterion.rubric_name(category);
        let task = self.task_criteria(category);
        let assessment = task
            .criteria
            .get(name)
            .ok_or_else(|| Self::not_found(category, name, None))?;

        let mut text = format!("When evaluating **{name}** you must consider ONLY:\n");
        for point in &assessment.common_assessment {
            text.push_str(&format!("- {point}\n"));
        }
        for point in &assessment.specific_assessment {
            text.push_str(&format!("- {point}\n"));
        }
        Ok(text)
    }

    /// All assessment criteria for a category, including the exam-type
    /// penalty list. Used by the meta evaluator.
    pub fn all_assessment_criteria_text(
        &self,
        category: EssayCategory,
    ) -> Result<String, DescriptorError> {
        let task = self.task_criteria(category);
        let exam = self.criteria_for(category.exam_type());
        let body = serde_json::to_string_pretty(&task.criteria)?;
        let penalties = serde_json::to_string_pretty(&exam.penalties)?;
        Ok(format!(
            "The IELTS essay must be assessed according to the following criteria:\n\
             \n\
             - \"common_assessment\": core IELTS writing standards\n\
             - \"specific_assessment\": requirements unique to the {exam} writing test\n\
             \n\
             For **{label}**, the essay will be assessed on:\n\
             \n\
             {body}\n\
             \n\
             **Penalties apply in these cases:**\n\
             {penalties}\n",
            exam = category.exam_type(),
            label = category.label(),
            body = body,
            penalties = penalties,
        ))
    }

    /// The official task description for a category.
    pub fn task_description(&self, category: EssayCategory) -> Result<String, DescriptorError> {
        Ok(self.task_criteria(category).description.clone())
    }

    /// Minimum word count required for a category (150 for Task 1, 250 for
    /// Task 2 — read from the data, not hardcoded).
    pub fn min_word_count(&self, category: EssayCategory) -> Result<u32, DescriptorError> {
        Ok(self.task_criteria(category).word_requirement)
    }
}
