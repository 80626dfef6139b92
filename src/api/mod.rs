//! HTTP handler layer
//!
//! Decodes requests, calls into the batcher, the completion client or the
//! process runner, and encodes the result. No concurrency logic lives here.

mod assist;
mod execute;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::batcher::{BatchError, RequestBatcher};
use crate::catalog::CourseCatalog;
use crate::completion::{CompletionClient, CompletionError};
use crate::prompts::FeaturePrompts;
use crate::runner::ProcessRunner;

#[derive(Clone)]
pub struct AppState {
    pub batcher: RequestBatcher,
    pub client: Arc<dyn CompletionClient>,
    pub runner: Arc<ProcessRunner>,
    pub features: Arc<FeaturePrompts>,
    pub catalog: CourseCatalog,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ask", post(assist::ask))
        .route("/lesson", post(assist::lesson))
        .route("/test", post(assist::test))
        .route("/feedback", post(assist::feedback))
        .route("/compiler-features", post(assist::compiler_features))
        .route("/conspect", post(assist::conspect))
        .route("/recommend", post(assist::recommend))
        .route("/execute", post(execute::execute))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::RequestFailed(_) => {
                api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            BatchError::Closed => api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        }
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}
