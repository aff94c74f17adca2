//! HTTP surface for the essay evaluation service.
//!
//! # Endpoints
//!
//! - `GET  /`              — status probe
//! - `GET  /process_essay` — service contract description
//! - `POST /process_essay` — evaluate an essay (API-key authenticated)

pub mod auth;
pub mod routes;

pub use auth::{ApiKeyStore, API_KEY_HEADER};
pub use routes::{app_router, AppState, SubmissionRequest};
