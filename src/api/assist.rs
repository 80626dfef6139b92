//! Assistant endpoints backed by the completion client

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{api_error, ApiError, AppState};
use crate::catalog::{filter_courses, Course};
use crate::completion::ChatMessage;
use crate::reply::{extract_languages, split_text_and_code};

const CONSPECT_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates well-structured \
     educational content in the style requested by the user.";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub parameter: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub question: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    pub input: String,
    pub feature: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct TextCodeResponse {
    pub text: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ConspectRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub topic: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub rules_style: String,
}

#[derive(Debug, Serialize)]
pub struct ConspectResponse {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub result: String,
    pub courses: BTreeMap<String, Option<Vec<Course>>>,
}

/// Append the programming language hint the prompts expect
fn compose_payload(text: &str, language: &str) -> String {
    if language.trim().is_empty() {
        text.to_string()
    } else {
        format!("{}\n programming language is {}", text, language.trim())
    }
}

async fn answer_query(
    state: &AppState,
    kind: &str,
    req: QueryRequest,
) -> Result<Json<QueryResponse>, ApiError> {
    let payload = compose_payload(&req.parameter, &req.language);
    let result = state.batcher.submit(kind, payload).await?;

    Ok(Json(QueryResponse {
        result: format!("{}\n{}", result, req.language),
    }))
}

pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    answer_query(&state, "ask", req).await
}

pub async fn lesson(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    answer_query(&state, "lesson", req).await
}

pub async fn test(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    answer_query(&state, "test", req).await
}

/// Review code. A `question` naming a feature prompt bypasses the batcher.
pub async fn feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<TextCodeResponse>, ApiError> {
    let reply = match state.features.get(&req.question) {
        Some(prompt) => {
            state
                .client
                .complete(prompt, &compose_payload(&req.input, &req.language))
                .await?
        }
        None => {
            let text = format!("{}\n{}", req.question, req.input);
            state
                .batcher
                .submit("feedback", compose_payload(&text, &req.language))
                .await?
        }
    };

    let (text, code) = split_text_and_code(&reply);
    Ok(Json(TextCodeResponse { text, code }))
}

pub async fn compiler_features(
    State(state): State<AppState>,
    Json(req): Json<FeatureRequest>,
) -> Result<Json<TextCodeResponse>, ApiError> {
    let prompt = state
        .features
        .get(&req.feature)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "unsupported feature"))?;

    let reply = state
        .client
        .complete(prompt, &compose_payload(&req.input, &req.language))
        .await?;

    let (text, code) = split_text_and_code(&reply);
    Ok(Json(TextCodeResponse { text, code }))
}

pub async fn conspect(
    State(state): State<AppState>,
    Json(req): Json<ConspectRequest>,
) -> Result<Json<ConspectResponse>, ApiError> {
    let intro = format!(
        "Topic: {}\nLanguage: {}\nStyle: {}\n\
         Now generate the text according to this request and keep previous messages in mind.",
        req.topic, req.language, req.rules_style
    );

    let mut messages = vec![
        ChatMessage::system(CONSPECT_SYSTEM_PROMPT),
        ChatMessage::user(intro),
    ];
    messages.extend(req.messages);

    let text = state.client.complete_chat(messages).await?;

    Ok(Json(ConspectResponse {
        title: req.topic,
        text,
    }))
}

pub async fn recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let result = state.batcher.submit("yourlanguage", req.question).await?;

    let languages = extract_languages(&result);
    info!("Recommending courses for languages: {:?}", languages);

    let courses = state.catalog.fetch_courses().await.map_err(|e| {
        warn!("Course catalog unavailable: {:#}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch courses")
    })?;

    Ok(Json(RecommendResponse {
        courses: filter_courses(&languages, &courses),
        result,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::app_state;
    use crate::completion::mock::MockCompletion;
    use std::sync::Arc;
    use std::time::Duration;

    fn state_with(mock: &Arc<MockCompletion>) -> AppState {
        app_state(mock, Duration::from_secs(3))
    }

    #[test]
    fn test_compose_payload() {
        assert_eq!(compose_payload("x = 1", ""), "x = 1");
        assert_eq!(
            compose_payload("x = 1", " python "),
            "x = 1\n programming language is python"
        );
    }

    #[tokio::test]
    async fn test_ask_goes_through_batcher() {
        let mock = Arc::new(MockCompletion::echo("answer: "));
        let state = state_with(&mock);

        let Json(resp) = ask(
            State(state.clone()),
            Json(QueryRequest {
                parameter: "what is a loop".into(),
                language: "python".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            resp.result,
            "answer: what is a loop\n programming language is python\npython"
        );
        assert_eq!(state.batcher.batches_dispatched(), 1);
    }

    #[tokio::test]
    async fn test_feedback_with_feature_bypasses_batcher() {
        let mock = Arc::new(MockCompletion::echo("```\nfixed\n```\n"));
        let state = state_with(&mock);

        let Json(resp) = feedback(
            State(state.clone()),
            Json(FeedbackRequest {
                question: "explain".into(),
                input: "let x = 1;".into(),
                language: String::new(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(resp.code, "fixed");
        assert_eq!(state.batcher.batches_dispatched(), 0);
        assert_eq!(mock.calls()[0].messages[0].content, "Explain the code");
    }

    #[tokio::test]
    async fn test_feedback_without_feature_is_batched() {
        let mock = Arc::new(MockCompletion::echo(""));
        let state = state_with(&mock);

        let Json(resp) = feedback(
            State(state.clone()),
            Json(FeedbackRequest {
                question: "is this right?".into(),
                input: "print(1)".into(),
                language: "python".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            resp.text,
            "is this right?\nprint(1)\n programming language is python"
        );
        assert!(resp.code.is_empty());
        assert_eq!(state.batcher.batches_dispatched(), 1);
    }

    #[tokio::test]
    async fn test_feedback_downstream_failure_is_500() {
        let mock = Arc::new(MockCompletion::echo("").failing_on("crash"));
        let state = state_with(&mock);

        let (status, Json(body)) = feedback(
            State(state),
            Json(FeedbackRequest {
                question: "crash please".into(),
                input: String::new(),
                language: String::new(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.error.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_compiler_features_unknown_feature() {
        let mock = Arc::new(MockCompletion::echo(""));
        let state = state_with(&mock);

        let (status, Json(body)) = compiler_features(
            State(state),
            Json(FeatureRequest {
                input: "code".into(),
                feature: "translate".into(),
                language: String::new(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "unsupported feature");
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_conspect_builds_conversation() {
        let mock = Arc::new(MockCompletion::echo("notes on "));
        let state = state_with(&mock);

        let Json(resp) = conspect(
            State(state),
            Json(ConspectRequest {
                messages: vec![ChatMessage::user("make it short")],
                topic: "Recursion".into(),
                language: "go".into(),
                rules_style: "bullet points".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(resp.title, "Recursion");
        assert_eq!(resp.text, "notes on make it short");

        let messages = &mock.calls()[0].messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1]
            .content
            .starts_with("Topic: Recursion\nLanguage: go\nStyle: bullet points"));
    }
}
