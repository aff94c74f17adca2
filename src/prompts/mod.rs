//! Prompt templates for the scoring, gap-analysis and meta-evaluation calls.
//!
//! Templates are plain embedded strings with `{placeholder}` slots filled by
//! a replace chain; the render functions are the only way prompts are built.

use std::collections::BTreeMap;

/// Fixed instruction attached to every length-sensitive scoring prompt:
/// trivially short responses are scored at the floor.
pub const SHORT_RESPONSE_RULE: &str =
    "If the response is 20 words or fewer, the band score for this criterion MUST be 1.";

/// Paragraphing heuristic for the coherence agent, applied when the essay
/// contains no line break at all.
pub const MISSING_PARAGRAPH_RULE: &str = "The essay contains no paragraph breaks. Reduce the \
     Coherence and Cohesion band score by 1-2 bands depending on the impact on readability.";

/// Congratulation returned when the target band is met; gap analysis makes
/// no further calls in that case.
pub const TARGET_MET_MESSAGE: &str =
    "Well Done. The essay meets or exceeds your target band. Maintain current writing quality.";

/// Prompt for the image description model.
pub const IMAGE_DESCRIPTION_PROMPT: &str = "\
Provide a short summary of the context of the image.
Identify the type of image (diagram, graph, table, chart, map or other).
Only provide factual content about the visual (explain trends, the components, colour coding etc.)
Keep the context summary to no more than 3 sentences.

If it is not a single image or you are unable to provide a description then don't respond.
";

const EVALUATION_TEMPLATE: &str = "\
You are an expert IELTS examiner specialising in {criteria} in writing.

Your task is to evaluate the following essay according to IELTS {criteria} assessment criteria.

Essay:
{essay}

Question:
{question}

Task Description:
{task_description}
{image_section}
Ensure the comments are formatted in markdown as below:
**General Comments:**
**You did very well:**
**Need to improve:**
**Examples of errors:**
**How to improve your score:**

Respond with a JSON object containing exactly two fields:
\"score\": <integer 0-9>
\"comment\": <brief, actionable feedback with examples>

You must use the following tools to guide your evaluation:
{\"Assessment Criteria Tool\": {criteria_tool},
\"Band Descriptor Tool\": {band_tool}}

Instructions for evaluation:
1. Assign a band score (1-9) based strictly on {criteria} criteria.
2. Provide concise and non-redundant comments explaining the score.
3. Highlight specific strengths and weaknesses in the essay, referencing the tool outputs where relevant.
4. Suggest actionable improvements for the writer to raise their score.
{notes}
";

const GAP_ANALYSIS_TEMPLATE: &str = "\
You are a senior IELTS teacher.
Follow the instructions below to generate an answer:

1. Evaluate the examiner comments below.
2. Compare the actual result and comments to the expectations on the target band descriptors and assessment guidelines.
3. Create a professional response to the student receiving the feedback.

4. Consider the following information to write the response:

    The student's current overall band is {overall_band}, target is {target_band}.
    Weak areas: {weak_bands}

    criteria evaluation:
    {weak_comments}

    Target band descriptors:
    {descriptor_data}

    Assessment criteria guidelines:
    {criteria_data}

5. Generate an actionable, criterion-specific improvement plan that helps the student reach Band {target_band}.
6. Provide 1-2 concise and focused suggestions per weak criterion, written in clear, teacher-style feedback.
7. Keep the response concise.
8. DO NOT mention the examiner or a mention about this prompt.
9. Do not repeat what is already in the comments.
10. Keep suggestions concise, practical, professional and using Australian English.
11. Ensure that the output is in markdown format with criteria names and titles in **bold**
12. Ensure the comments are formatted in markdown as below:

**Overview:**
**Improvement Plan:**
";

const META_EVALUATION_TEMPLATE: &str = "\
You are a senior IELTS examiner and AI evaluation specialist.
Your task is to critically evaluate the feedback provided by specialised IELTS LLM agents for an essay.
---

### INPUTS

Essay:
{essay}

Question:
{question}

LLM output:

    * Grammatical Range and Accuracy feedback:
    {grammar_comment}

    * Lexical Resource feedback:
    {lexical_comment}

    * Coherence and Cohesion feedback:
    {coherence_comment}

    * Task Achievement / Task Response feedback:
    {task_comment}

    * Overall Feedback:
    {overall_feedback}

---
IELTS description of the type of essay:
{task_description}

IELTS assessment per criteria:
{assessment_criteria}

---
IELTS marking rubrics for the actual band per criteria:
    * Grammatical Range and Accuracy:
    {descriptors_grammar}

    * Lexical Resource:
    {descriptors_lexical}

    * Coherence and Cohesion:
    {descriptors_coherence}

    * Task Achievement / Task Response:
    {descriptors_task}

### EVALUATION INSTRUCTIONS

Judge the LLM output ONLY as an *evaluation*, not as an essay.

Your role is to determine how accurately and usefully the feedback aligns with the official IELTS marking rubrics.

**Task Accuracy**
- Does the feedback correctly understand the essay's task requirements or argument relevance?
- Are its comments consistent with IELTS band descriptors?
- Does it justify its score with textual evidence?

**Grammar Evaluation Quality**
- Are grammar errors correctly identified and explained?
- Does it reflect IELTS grammatical range and accuracy descriptors?

**Lexical Evaluation Quality**
- Does it assess vocabulary range, precision, and appropriacy accurately?
- Are word choice issues correctly identified?

**Coherence Evaluation Quality**
- Does it evaluate logical flow, paragraphing, and cohesion accurately?
- Does the explanation match IELTS expectations?

**Feedback Quality**
- Are comments clear, specific, and constructive?
- Is the score consistent with feedback text?
- Does it cover all IELTS subcriteria?

---

### OUTPUT FORMAT

Return your evaluation with normalised scores between 0 and 1 for each dimension.
The output must be a single JSON object with this structure:

{
  \"task_accuracy\": {
      \"criterion_alignment\": 0.0,
      \"score_validity\": 0.0,
      \"content_understanding\": 0.0,
      \"evidence_reference\": 0.0
  },
  \"grammar_eval_qualy\": {
      \"error_detection_accuracy\": 0.0,
      \"error_explanation_quality\": 0.0,
      \"band_alignment\": 0.0,
      \"coverage\": 0.0
  },
  \"lexical_eval_qualy\": {
      \"range_assessment_accuracy\": 0.0,
      \"appropriacy_assessment\": 0.0,
      \"error_identification\": 0.0,
      \"band_alignment\": 0.0
  },
  \"coherence_eval_qualy\": {
      \"structure_analysis\": 0.0,
      \"linking_accuracy\": 0.0,
      \"clarity_of_reasoning\": 0.0,
      \"band_alignment\": 0.0
  },
  \"feedback_qualy\": {
      \"clarity\": 0.0,
      \"specificity\": 0.0,
      \"constructiveness\": 0.0,
      \"score_comment_alignment\": 0.0,
      \"IELTS_rubric_coverage\": 0.0
  },
  \"meta_summary\": {
      \"overall_quality\": 0.0,
      \"key_strengths\": [],
      \"key_weaknesses\": [],
      \"improvement_suggestions\": []
  },
  \"track_id\": \"{track_id}\"
}
";

// ---------------------------------------------------------------------------
// Render functions
// ---------------------------------------------------------------------------

/// Inputs shared by every criterion evaluation prompt.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    /// Rubric name of the criterion under evaluation.
    pub criterion_name: &'a str,
    /// The essay text.
    pub essay: &'a str,
    /// The essay question.
    pub question: &'a str,
    /// Task description from the rubric store.
    pub task_description: &'a str,
    /// Assessment-criteria text from the rubric store.
    pub assessment_criteria: &'a str,
    /// Band-descriptor text from the rubric store.
    pub band_descriptors: &'a str,
    /// Criterion-specific notes (short-response rule, paragraphing rule,
    /// word-count penalty hint). May be empty.
    pub notes: &'a str,
}

/// Render the text-only criterion evaluation prompt.
pub fn render_evaluation(ctx: &EvaluationContext<'_>) -> String {
    render_evaluation_inner(ctx, None)
}

/// Render the image-aware task evaluation prompt. Identical to the text
/// prompt plus the resolved image description.
pub fn render_task_image_evaluation(
    ctx: &EvaluationContext<'_>,
    image_description: &str,
) -> String {
    render_evaluation_inner(ctx, Some(image_description))
}

fn render_evaluation_inner(ctx: &EvaluationContext<'_>, image_description: Option<&str>) -> String {
    let image_section = match image_description {
        Some(description) => format!("\nImage Description:\n{description}\n"),
        None => String::new(),
    };
    let notes = if ctx.notes.is_empty() {
        String::new()
    } else {
        format!("\nAdditional scoring rules that MUST be applied:\n{}\n", ctx.notes)
    };
    EVALUATION_TEMPLATE
        .replace("{criteria}", ctx.criterion_name)
        .replace("{essay}", ctx.essay)
        .replace("{question}", ctx.question)
        .replace("{task_description}", ctx.task_description)
        .replace("{image_section}", &image_section)
        .replace("{criteria_tool}", ctx.assessment_criteria)
        .replace("{band_tool}", ctx.band_descriptors)
        .replace("{notes}", &notes)
}

/// Render the consolidated improvement-plan prompt covering every weak
/// criterion in one request.
pub fn render_gap_analysis(
    overall_band: f64,
    target_band: u8,
    weak_bands: &BTreeMap<String, u8>,
    weak_comments: &BTreeMap<String, String>,
    descriptor_data: &BTreeMap<String, String>,
    criteria_data: &BTreeMap<String, String>,
) -> String {
    let weak_summary = weak_bands
        .iter()
        .map(|(name, score)| format!("{name}: Band {score}"))
        .collect::<Vec<_>>()
        .join(", ");
    GAP_ANALYSIS_TEMPLATE
        .replace("{overall_band}", &format!("{overall_band:.1}"))
        .replace("{target_band}", &target_band.to_string())
        .replace("{weak_bands}", &weak_summary)
        .replace("{weak_comments}", &join_sections(weak_comments))
        .replace("{descriptor_data}", &join_sections(descriptor_data))
        .replace("{criteria_data}", &join_sections(criteria_data))
}

/// Inputs for the meta-evaluation prompt.
#[derive(Debug, Clone)]
pub struct MetaEvaluationContext<'a> {
    pub track_id: &'a str,
    pub essay: &'a str,
    pub question: &'a str,
    pub grammar_comment: &'a str,
    pub lexical_comment: &'a str,
    pub coherence_comment: &'a str,
    pub task_comment: &'a str,
    pub overall_feedback: &'a str,
    pub task_description: &'a str,
    pub assessment_criteria: &'a str,
    pub descriptors_grammar: &'a str,
    pub descriptors_lexical: &'a str,
    pub descriptors_coherence: &'a str,
    pub descriptors_task: &'a str,
}

/// Render the meta-evaluation prompt.
pub fn render_meta_evaluation(ctx: &MetaEvaluationContext<'_>) -> String {
    META_EVALUATION_TEMPLATE
        .replace("{track_id}", ctx.track_id)
        .replace("{essay}", ctx.essay)
        .replace("{question}", ctx.question)
        .replace("{grammar_comment}", ctx.grammar_comment)
        .replace("{lexical_comment}", ctx.lexical_comment)
        .replace("{coherence_comment}", ctx.coherence_comment)
        .replace("{task_comment}", ctx.task_comment)
        .replace("{overall_feedback}", ctx.overall_feedback)
        .replace("{task_description}", ctx.task_description)
        .replace("{assessment_criteria}", ctx.assessment_criteria)
        .replace("{descriptors_grammar}", ctx.descriptors_grammar)
        .replace("{descriptors_lexical}", ctx.descriptors_lexical)
        .replace("{descriptors_coherence}", ctx.descriptors_coherence)
        .replace("{descriptors_task}", ctx.descriptors_task)
}

fn join_sections(sections: &BTreeMap<String, String>) -> String {
    sections
        .iter()
        .map(|(name, body)| format!("### {name}\n{body}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(notes: &'a str) -> EvaluationContext<'a> {
        EvaluationContext {
            criterion_name: "Lexical Resource",
            essay: "The chart shows a rise in sales.",
            question: "Summarise the chart.",
            task_description: "Summarise the information shown.",
            assessment_criteria: "- range of vocabulary",
            band_descriptors: "band text",
            notes,
        }
    }

    #[test]
    fn evaluation_prompt_interpolates_all_slots() {
        let prompt = render_evaluation(&ctx(SHORT_RESPONSE_RULE));
        assert!(prompt.contains("Lexical Resource"));
        assert!(prompt.contains("The chart shows a rise in sales."));
        assert!(prompt.contains("20 words or fewer"));
        assert!(!prompt.contains("{essay}"));
        assert!(!prompt.contains("{notes}"));
        assert!(!prompt.contains("Image Description"));
    }

    #[test]
    fn image_prompt_includes_description() {
        let prompt = render_task_image_evaluation(&ctx(""), "A bar chart of annual sales.");
        assert!(prompt.contains("Image Description:"));
        assert!(prompt.contains("A bar chart of annual sales."));
    }

    #[test]
    fn gap_prompt_accumulates_all_weak_criteria() {
        let mut weak = BTreeMap::new();
        weak.insert("Coherence & Cohesion".to_string(), 5u8);
        weak.insert("Lexical Resource".to_string(), 6u8);
        let mut comments = BTreeMap::new();
        comments.insert("Coherence & Cohesion".to_string(), "mechanical linking".to_string());
        comments.insert("Lexical Resource".to_string(), "repetitive word choice".to_string());
        let mut descriptors = BTreeMap::new();
        descriptors.insert("Coherence & Cohesion".to_string(), "band 7 text".to_string());
        descriptors.insert("Lexical Resource".to_string(), "band 7 text".to_string());

        let prompt = render_gap_analysis(6.0, 7, &weak, &comments, &descriptors, &descriptors);
        assert!(prompt.contains("Coherence & Cohesion: Band 5"));
        assert!(prompt.contains("Lexical Resource: Band 6"));
        assert!(prompt.contains("mechanical linking"));
        assert!(prompt.contains("repetitive word choice"));
        assert!(prompt.contains("current overall band is 6.0, target is 7"));
    }

    #[test]
    fn meta_prompt_embeds_track_id() {
        let ctx = MetaEvaluationContext {
            track_id: "trk-042",
            essay: "essay",
            question: "question",
            grammar_comment: "g",
            lexical_comment: "l",
            coherence_comment: "c",
            task_comment: "t",
            overall_feedback: "o",
            task_description: "d",
            assessment_criteria: "a",
            descriptors_grammar: "dg",
            descriptors_lexical: "dl",
            descriptors_coherence: "dc",
            descriptors_task: "dt",
        };
        let prompt = render_meta_evaluation(&ctx);
        assert!(prompt.contains("\"track_id\": \"trk-042\""));
    }
}
