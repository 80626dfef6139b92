//! Code execution endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{api_error, ApiError, AppState};
use crate::runner::{RunError, RunOutcome};

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RunOutcome> for CodeResponse {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            stdout: outcome.stdout_lossy(),
            stderr: outcome.stderr_lossy(),
            exit_code: outcome.exit_code,
            timed_out: outcome.timed_out,
            error: outcome
                .timed_out
                .then(|| "Execution timed out".to_string()),
        }
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::UnsupportedLanguage(_) => {
                api_error(StatusCode::BAD_REQUEST, err.to_string())
            }
            _ => {
                error!("Code execution failed: {}", err);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

/// Run caller code; a timeout answers 408 with the partial output
pub async fn execute(
    State(state): State<AppState>,
    Json(req): Json<CodeRequest>,
) -> Result<(StatusCode, Json<CodeResponse>), ApiError> {
    info!(
        "Received execute request: language={}, code_len={}",
        req.language,
        req.code.len()
    );

    let outcome = state.runner.run(&req.language, &req.code).await?;
    info!(
        "Execution finished: language={}, success={}, timed_out={}",
        req.language,
        outcome.is_success(),
        outcome.timed_out
    );

    let status = if outcome.timed_out {
        StatusCode::REQUEST_TIMEOUT
    } else {
        StatusCode::OK
    };

    Ok((status, Json(CodeResponse::from(outcome))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::app_state;
    use crate::completion::mock::MockCompletion;
    use std::sync::Arc;
    use std::time::Duration;

    fn request(language: &str, code: &str) -> Json<CodeRequest> {
        Json(CodeRequest {
            language: language.into(),
            code: code.into(),
        })
    }

    #[tokio::test]
    async fn test_execute_success() {
        let state = app_state(&Arc::new(MockCompletion::echo("")), Duration::from_secs(3));

        let (status, Json(resp)) = execute(State(state), request("shell", "echo X"))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            resp,
            CodeResponse {
                stdout: "X\n".into(),
                stderr: String::new(),
                exit_code: 0,
                timed_out: false,
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn test_execute_timeout_is_408_with_partial_output() {
        let state = app_state(&Arc::new(MockCompletion::echo("")), Duration::from_millis(200));

        let (status, Json(resp)) =
            execute(State(state), request("shell", "echo started\nsleep 5"))
                .await
                .unwrap();

        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert!(resp.timed_out);
        assert_eq!(resp.stdout, "started\n");
        assert_eq!(resp.error.as_deref(), Some("Execution timed out"));
    }

    #[tokio::test]
    async fn test_execute_unsupported_language_is_400() {
        let state = app_state(&Arc::new(MockCompletion::echo("")), Duration::from_secs(3));

        let (status, Json(body)) = execute(State(state), request("brainfuck", "+"))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Unsupported language: brainfuck");
    }

    #[test]
    fn test_code_response_serialization() {
        let resp = CodeResponse::from(RunOutcome {
            stdout: b"out".to_vec(),
            stderr: Vec::new(),
            exit_code: 1,
            timed_out: false,
        });

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"stdout": "out", "stderr": "", "exitCode": 1, "timedOut": false})
        );
    }
}
