//! Task achievement / task response scoring agent.
//!
//! Before scoring, the agent resolves an image description and computes the
//! deterministic word-count penalty note. The image-aware prompt is chosen
//! only when the submission's image URL probes as a real, fetchable image.

use std::sync::Arc;

use crate::descriptors::DescriptorStore;
use crate::error::EvaluationError;
use crate::llms::{ScoreRequest, ScoringModel};
use crate::prompts::{self, EvaluationContext};
use crate::types::{Criterion, ScoreResult, Submission};

use super::image::ImageDescriptionStep;
use super::word_count;

/// Output of the task branch: the score plus the resolved description that
/// the aggregate state carries to the boundary.
#[derive(Debug, Clone)]
pub struct TaskEvaluation {
    /// The task criterion score.
    pub result: ScoreResult,
    /// Description resolved by the image step (possibly absent).
    pub image_description: Option<String>,
}

/// Scoring agent for the task criterion.
#[derive(Debug)]
pub struct TaskAgent {
    model: Arc<dyn ScoringModel>,
    image_step: ImageDescriptionStep,
}

impl TaskAgent {
    /// Build the task agent around a scoring model and the image step.
    pub fn new(model: Arc<dyn ScoringModel>, image_step: ImageDescriptionStep) -> Self {
        Self { model, image_step }
    }

    /// Produce the task criterion's [`TaskEvaluation`].
    pub async fn evaluate(
        &self,
        submission: &Submission,
        store: &DescriptorStore,
    ) -> Result<TaskEvaluation, EvaluationError> {
        let category = submission.category;
        let band_descriptors = store.rubric_text(category, Criterion::Task)?;
        let assessment_criteria = store.assessment_criteria_text(category, Criterion::Task)?;
        let task_description = store.task_description(category)?;
        let min_words = store.min_word_count(category)?;
        let notes = word_count::penalty_note(min_words, &submission.essay);

        let image_description = self
            .image_step
            .resolve(
                submission.image_url.as_deref(),
                submission.image_description.as_deref(),
            )
            .await;

        let image_available = match submission.image_url.as_deref() {
            Some(url) => self.image_step.probe().is_image(url).await,
            None => false,
        };

        let ctx = EvaluationContext {
            criterion_name: Criterion::Task.rubric_name(category),
            essay: &submission.essay,
            question: &submission.question,
            task_description: &task_description,
            assessment_criteria: &assessment_criteria,
            band_descriptors: &band_descriptors,
            notes: &notes,
        };

        let (prompt, image_url) = if image_available {
            let description = image_description.as_deref().unwrap_or("(not available)");
            (
                prompts::render_task_image_evaluation(&ctx, description),
                submission.image_url.clone(),
            )
        } else {
            (prompts::render_evaluation(&ctx), None)
        };

        log::debug!(
            "task_eval: scoring essay {} (image attached: {})",
            submission.track_id,
            image_url.is_some()
        );

        let result = self
            .model
            .score(&ScoreRequest {
                agent: Criterion::Task.branch_name(),
                prompt,
                image_url,
            })
            .await
            .map_err(|source| EvaluationError::Branch {
                branch: Criterion::Task.branch_name(),
                source,
            })?;

        Ok(TaskEvaluation {
            result,
            image_description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::image::ImageProbe;
    use crate::error::LlmError;
    use crate::types::EssayCategory;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct RecordingModel {
        requests: Mutex<Vec<ScoreRequest>>,
    }

    #[async_trait]
    impl ScoringModel for RecordingModel {
        fn model(&self) -> &str {
            "fake"
        }
        fn name(&self) -> &str {
            "task_agent"
        }
        async fn score(&self, request: &ScoreRequest) -> Result<ScoreResult, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            ScoreResult::new(6, "covers the task adequately").map_err(|e| {
                LlmError::MalformedResponse {
                    detail: e.to_string(),
                }
            })
        }
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            unreachable!()
        }
        async fn describe_image(
            &self,
            _prompt: &str,
            _image_url: &str,
        ) -> Result<Option<String>, LlmError> {
            Ok(Some("a line graph of visitor numbers".to_string()))
        }
    }

    fn agent(model: Arc<RecordingModel>) -> TaskAgent {
        let probe = ImageProbe::new(Duration::from_secs(1));
        let image_step = ImageDescriptionStep::new(model.clone(), probe);
        TaskAgent::new(model, image_step)
    }

    fn submission(image_url: Option<String>, description: Option<String>) -> Submission {
        Submission::new(
            "trk-020",
            "Summarise the graph.",
            "The graph shows visitor numbers rising steadily over the decade across all sites.",
            EssayCategory::AcademicTask1,
            7,
            image_url,
            description,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn text_only_prompt_when_no_image() {
        let model = Arc::new(RecordingModel::default());
        let evaluation = agent(model.clone())
            .evaluate(&submission(None, None), DescriptorStore::embedded())
            .await
            .unwrap();

        assert_eq!(evaluation.result.band, 6);
        assert_eq!(evaluation.image_description, None);
        let requests = model.requests.lock().unwrap();
        assert!(requests[0].image_url.is_none());
        assert!(!requests[0].prompt.contains("Image Description"));
        // The word-count note always rides along.
        assert!(requests[0].prompt.contains("minimum words required"));
    }

    #[tokio::test]
    async fn image_prompt_when_url_probes_as_image() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/png"))
            .mount(&server)
            .await;

        let model = Arc::new(RecordingModel::default());
        let evaluation = agent(model.clone())
            .evaluate(
                &submission(Some(server.uri()), None),
                DescriptorStore::embedded(),
            )
            .await
            .unwrap();

        assert_eq!(
            evaluation.image_description.as_deref(),
            Some("a line graph of visitor numbers")
        );
        let requests = model.requests.lock().unwrap();
        assert!(requests[0].image_url.is_some());
        assert!(requests[0].prompt.contains("a line graph of visitor numbers"));
    }

    #[tokio::test]
    async fn unresolvable_image_keeps_supplied_description_and_text_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let model = Arc::new(RecordingModel::default());
        let evaluation = agent(model.clone())
            .evaluate(
                &submission(Some(server.uri()), Some("a supplied description".into())),
                DescriptorStore::embedded(),
            )
            .await
            .unwrap();

        // The originally supplied description survives unchanged.
        assert_eq!(
            evaluation.image_description.as_deref(),
            Some("a supplied description")
        );
        let requests = model.requests.lock().unwrap();
        assert!(requests[0].image_url.is_none());
    }
}
