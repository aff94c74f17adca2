//! Essay evaluation HTTP server binary.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `GRAMMAR_MODEL` / `LEXICAL_MODEL` / `COHERENCE_MODEL` / `TASK_MODEL` /
//!   `IMAGE_MODEL` / `OVERALL_MODEL` / `EVAL_MODEL` — per-agent model names
//! - `GEMINI_API_KEY` / `OPENAI_API_KEY` — provider credentials
//! - `EVAL_MONITORING` — enable the meta-evaluation side channel
//! - `EVALUATIONS_DIR` — directory for meta-evaluation reports
//! - `API_KEYS_FILE` — CSV file of `user,api_key` rows (default: user_keys.csv)
//! - `ELA_ENV` — environment label shown by the status endpoint
//! - `RUST_LOG` — tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;

use anyhow::Context;

use ielts_grader::config::Settings;
use ielts_grader::flow::EvaluationFlow;
use ielts_grader::server::{app_router, ApiKeyStore, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; the log bridge captures log-crate records too.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ielts_grader=debug".into()),
        )
        .init();

    let settings = Settings::from_env();

    let flow = EvaluationFlow::from_settings(&settings)
        .context("failed to construct the evaluation workflow")?;
    let keys = ApiKeyStore::from_csv_file(&settings.api_keys_file)
        .context("failed to load the API key file")?;
    tracing::info!("loaded {} API keys", keys.len());

    let state = AppState::new(Arc::new(flow), keys, settings.environment.clone());
    let app = app_router(state);

    tracing::info!("ielts-grader starting on {}", settings.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /              — status probe");
    tracing::info!("  GET  /process_essay — service description");
    tracing::info!("  POST /process_essay — evaluate an essay");

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .context("failed to bind")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
}
