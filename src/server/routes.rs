//! Axum route handlers for the essay evaluation service.
//!
//! # Routes
//!
//! - `GET  /`               — service status probe
//! - `GET  /process_essay`  — service contract description (no auth)
//! - `POST /process_essay`  — evaluate an essay (requires `X-API-Key`)

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::EvaluationError;
use crate::flow::EvaluationFlow;
use crate::types::{EssayCategory, Submission};

use super::auth::{ApiKeyStore, API_KEY_HEADER};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The evaluation workflow.
    pub flow: Arc<EvaluationFlow>,
    /// API-key → user mapping.
    pub keys: Arc<ApiKeyStore>,
    /// Track ids currently being evaluated. Duplicate submissions of the
    /// same id are rejected while the first is in flight.
    pub in_flight: Arc<DashMap<String, ()>>,
    /// Environment label for the status endpoint.
    pub environment: String,
}

impl AppState {
    /// Build the state around a workflow and key store.
    pub fn new(flow: Arc<EvaluationFlow>, keys: ApiKeyStore, environment: String) -> Self {
        Self {
            flow,
            keys: Arc::new(keys),
            in_flight: Arc::new(DashMap::new()),
            environment,
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/process_essay", get(describe_handler).post(process_essay_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Submission payload as received from the frontend.
#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    /// Tracking id for the request; generated when omitted.
    #[serde(default)]
    pub track_id: Option<String>,
    /// The essay question.
    pub question: String,
    /// The essay text.
    pub essay: String,
    /// Writing task code: 1=General Task 1, 2=General Task 2,
    /// 3=Academic Task 1, 4=Academic Task 2.
    #[serde(default = "default_essay_type")]
    pub essay_type: u8,
    /// Target band, 1-9.
    #[serde(default = "default_target_band")]
    pub target_band: u8,
    /// Optional image URL for Academic Writing Task 1.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Optional pre-supplied image description.
    #[serde(default)]
    pub image_description: Option<String>,
}

fn default_essay_type() -> u8 {
    2
}

fn default_target_band() -> u8 {
    9
}

impl SubmissionRequest {
    fn into_submission(self) -> Result<Submission, EvaluationError> {
        let category = EssayCategory::try_from(self.essay_type)?;
        let track_id = self
            .track_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Submission::new(
            track_id,
            self.question,
            self.essay,
            category,
            self.target_band,
            self.image_url,
            self.image_description,
        )
    }
}

/// GET / — status probe.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "ielts-grader",
        "version": crate::VERSION,
        "environment": state.environment,
    }))
}

/// GET /process_essay — contract description, no auth required.
async fn describe_handler() -> impl IntoResponse {
    Json(json!({
        "service": "ielts-grader",
        "endpoint": "POST /process_essay",
        "auth": format!("{API_KEY_HEADER} header"),
        "request": {
            "track_id": "string (>= 3 chars)",
            "question": "string",
            "essay": "string",
            "essay_type": "1=General Task 1, 2=General Task 2, 3=Academic Task 1, 4=Academic Task 2",
            "target_band": "integer 1-9",
            "image_url": "optional string",
            "image_description": "optional string",
        },
        "response": "{\"data\": evaluation report}",
    }))
}

/// POST /process_essay — run one evaluation.
async fn process_essay_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmissionRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    // Authenticate before anything else.
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let user = state.keys.user_for(api_key).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Missing or invalid API key" })),
        )
    })?;
    log::info!("authenticated user: {user}");

    // Validation failures are rejected before any workflow execution.
    let submission = request.into_submission().map_err(|err| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": err.to_string() })),
        )
    })?;

    // One evaluation per track id at a time.
    let track_id = submission.track_id.clone();
    if state.in_flight.insert(track_id.clone(), ()).is_some() {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "detail": "An evaluation for this track_id is already in progress" })),
        ));
    }

    let outcome = state.flow.evaluate(submission).await;
    state.in_flight.remove(&track_id);

    match outcome {
        Ok(report) => Ok(Json(json!({ "data": report }))),
        Err(err) => {
            // Internal detail is logged, never exposed.
            log::error!("evaluation failed for {track_id}: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Unable to Process Feedback" })),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{CriterionAgent, ImageDescriptionStep, ImageProbe, TaskAgent};
    use crate::descriptors::DescriptorStore;
    use crate::error::LlmError;
    use crate::flow::RetryPolicy;
    use crate::gap_analysis::GapAnalysisEngine;
    use crate::llms::{ScoreRequest, ScoringModel};
    use crate::types::{Criterion, ScoreResult};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct StubModel {
        band: u8,
        fail: bool,
    }

    #[async_trait]
    impl ScoringModel for StubModel {
        fn model(&self) -> &str {
            "stub"
        }
        fn name(&self) -> &str {
            "stub"
        }
        async fn score(&self, _request: &ScoreRequest) -> Result<ScoreResult, LlmError> {
            if self.fail {
                return Err(LlmError::EmptyResponse {
                    model: "stub".into(),
                });
            }
            ScoreResult::new(self.band, "stub comment text").map_err(|e| {
                LlmError::MalformedResponse {
                    detail: e.to_string(),
                }
            })
        }
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok("**Improvement Plan:** more cohesion practice.".into())
        }
        async fn describe_image(
            &self,
            _prompt: &str,
            _image_url: &str,
        ) -> Result<Option<String>, LlmError> {
            Ok(None)
        }
    }

    fn test_state(band: u8, fail: bool) -> AppState {
        let model = Arc::new(StubModel { band, fail });
        let store = Arc::new(DescriptorStore::embedded_copy().unwrap());
        let image_step = ImageDescriptionStep::new(
            model.clone(),
            ImageProbe::new(Duration::from_secs(1)),
        );
        let flow = EvaluationFlow::from_parts(
            store,
            CriterionAgent::new(Criterion::Grammar, model.clone()),
            CriterionAgent::new(Criterion::Lexical, model.clone()),
            CriterionAgent::new(Criterion::Coherence, model.clone()),
            TaskAgent::new(model.clone(), image_step),
            GapAnalysisEngine::new(model),
            None,
            RetryPolicy::new(1),
        );
        AppState::new(
            Arc::new(flow),
            ApiKeyStore::from_pairs(&[("tester", "valid-key")]),
            "test".into(),
        )
    }

    fn submit_request(api_key: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/process_essay")
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "track_id": "trk-900",
            "question": "Discuss the impact of tourism.",
            "essay": "Tourism brings income.\n\nIt also strains local infrastructure.",
            "essay_type": 2,
            "target_band": 7
        })
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn status_endpoint_reports_service() {
        let app = app_router(test_state(7, false));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["service"], "ielts-grader");
        assert_eq!(body["environment"], "test");
    }

    #[tokio::test]
    async fn missing_api_key_is_unauthorized() {
        let app = app_router(test_state(7, false));
        let response = app.oneshot(submit_request(None, valid_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_api_key_is_unauthorized() {
        let app = app_router(test_state(7, false));
        let response = app
            .oneshot(submit_request(Some("wrong-key"), valid_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_category_is_unprocessable() {
        let mut body = valid_body();
        body["essay_type"] = json!(9);
        let app = app_router(test_state(7, false));
        let response = app
            .oneshot(submit_request(Some("valid-key"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn successful_evaluation_wraps_report_in_data() {
        let app = app_router(test_state(7, false));
        let response = app
            .oneshot(submit_request(Some("valid-key"), valid_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["data"]["track_id"], "trk-900");
        assert_eq!(body["data"]["overall_band"], 7.0);
        assert_eq!(body["data"]["met_target"], true);
    }

    #[tokio::test]
    async fn workflow_failure_is_a_generic_500() {
        let app = app_router(test_state(7, true));
        let response = app
            .oneshot(submit_request(Some("valid-key"), valid_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await;
        assert_eq!(body["detail"], "Unable to Process Feedback");
    }

    #[tokio::test]
    async fn failed_evaluation_releases_the_track_id() {
        let state = test_state(7, true);
        let app = app_router(state.clone());
        let _ = app
            .clone()
            .oneshot(submit_request(Some("valid-key"), valid_body()))
            .await
            .unwrap();
        assert!(state.in_flight.is_empty());
    }
}
