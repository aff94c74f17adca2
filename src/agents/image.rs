//! Image probing and description resolution for Academic Writing Task 1.
//!
//! Image handling never fails an evaluation: every failure path degrades to
//! "no new description", preserving whatever description already existed.

use std::sync::Arc;
use std::time::Duration;

use crate::llms::ScoringModel;
use crate::prompts::IMAGE_DESCRIPTION_PROMPT;

/// Lightweight existence + content-type check for image URLs.
#[derive(Debug, Clone)]
pub struct ImageProbe {
    client: reqwest::Client,
}

impl ImageProbe {
    /// Build a probe with the given request timeout (five seconds by
    /// default, from [`crate::config::Settings`]).
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Whether the URL points at a fetchable image: HEAD request, redirects
    /// followed, 2xx status, Content-Type prefixed `image/`. Returns false
    /// on any transport error — this check never raises.
    pub async fn is_image(&self, url: &str) -> bool {
        let response = match self.client.head(url).send().await {
            Ok(response) => response,
            Err(err) => {
                log::debug!("image probe failed for {url}: {err}");
                return false;
            }
        };
        if !response.status().is_success() {
            return false;
        }
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false)
    }
}

/// Resolves the image description feeding the task agent.
#[derive(Debug)]
pub struct ImageDescriptionStep {
    model: Arc<dyn ScoringModel>,
    probe: ImageProbe,
}

impl ImageDescriptionStep {
    /// Build the step around an image-capable model and a probe.
    pub fn new(model: Arc<dyn ScoringModel>, probe: ImageProbe) -> Self {
        Self { model, probe }
    }

    /// The shared probe, also used by the task agent for prompt selection.
    pub fn probe(&self) -> &ImageProbe {
        &self.probe
    }

    /// Resolve a description for the submission's visual.
    ///
    /// A usable pre-existing description (non-empty and not the literal
    /// token "null") is returned unchanged without any network traffic,
    /// which makes the step idempotent and cheap to re-run. Otherwise a
    /// description is generated only when the URL probes as a real image;
    /// an empty or failed generation falls back to the original
    /// (possibly absent) description.
    pub async fn resolve(
        &self,
        image_url: Option<&str>,
        existing: Option<&str>,
    ) -> Option<String> {
        if let Some(description) = existing {
            if description_is_usable(description) {
                return Some(description.to_string());
            }
        }

        let url = match image_url {
            Some(url) => url,
            None => return existing.map(str::to_string),
        };

        if !self.probe.is_image(url).await {
            return existing.map(str::to_string);
        }

        match self.model.describe_image(IMAGE_DESCRIPTION_PROMPT, url).await {
            Ok(Some(description)) => Some(description),
            Ok(None) => existing.map(str::to_string),
            Err(err) => {
                log::warn!("image description failed for {url}: {err}");
                existing.map(str::to_string)
            }
        }
    }
}

/// A pre-existing description counts only if it is non-empty and not the
/// literal "null" the frontend sometimes sends.
fn description_is_usable(description: &str) -> bool {
    !description.is_empty() && description != "null"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llms::{ScoreRequest, ScoringModel};
    use crate::types::ScoreResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Scripted model: returns a fixed description and counts calls.
    #[derive(Debug, Default)]
    struct FakeImageModel {
        calls: AtomicUsize,
        response: Option<String>,
    }

    #[async_trait]
    impl ScoringModel for FakeImageModel {
        fn model(&self) -> &str {
            "fake-image"
        }
        fn name(&self) -> &str {
            "image_description_agent"
        }
        async fn score(&self, _request: &ScoreRequest) -> Result<ScoreResult, LlmError> {
            unreachable!("image step never scores")
        }
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            unreachable!("image step never generates")
        }
        async fn describe_image(
            &self,
            _prompt: &str,
            _image_url: &str,
        ) -> Result<Option<String>, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn step(response: Option<String>) -> (Arc<FakeImageModel>, ImageDescriptionStep) {
        let model = Arc::new(FakeImageModel {
            calls: AtomicUsize::new(0),
            response,
        });
        let probe = ImageProbe::new(Duration::from_secs(1));
        (model.clone(), ImageDescriptionStep::new(model, probe))
    }

    async fn image_server(content_type: &str, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(status).insert_header("Content-Type", content_type))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn probe_accepts_images_only() {
        let images = image_server("image/png", 200).await;
        let pages = image_server("text/html", 200).await;
        let broken = image_server("image/png", 404).await;

        let probe = ImageProbe::new(Duration::from_secs(1));
        assert!(probe.is_image(&images.uri()).await);
        assert!(!probe.is_image(&pages.uri()).await);
        assert!(!probe.is_image(&broken.uri()).await);
        // Unreachable host: false, not an error.
        assert!(!probe.is_image("http://127.0.0.1:1/missing.png").await);
    }

    #[tokio::test]
    async fn existing_description_short_circuits() {
        let (model, step) = step(Some("a generated description".into()));
        let resolved = step
            .resolve(Some("http://unused.invalid/x.png"), Some("a chart of rainfall"))
            .await;
        assert_eq!(resolved.as_deref(), Some("a chart of rainfall"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn null_token_and_empty_are_not_usable() {
        let server = image_server("image/png", 200).await;
        let uri = server.uri();
        for unusable in ["", "null"] {
            let (model, step) = step(Some("a bar chart of sales".into()));
            let resolved = step.resolve(Some(uri.as_str()), Some(unusable)).await;
            assert_eq!(resolved.as_deref(), Some("a bar chart of sales"));
            assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn failed_probe_preserves_original_description() {
        let server = image_server("text/html", 200).await;
        let uri = server.uri();
        let (model, step) = step(Some("should not be used".into()));
        let resolved = step.resolve(Some(uri.as_str()), None).await;
        assert_eq!(resolved, None);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn declined_generation_falls_back_to_original() {
        let server = image_server("image/jpeg", 200).await;
        let uri = server.uri();
        let (model, step) = step(None);
        let resolved = step.resolve(Some(uri.as_str()), None).await;
        assert_eq!(resolved, None);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }
}
