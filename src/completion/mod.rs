//! Completion client - the slow, rate-limited downstream the batcher protects

pub mod openai;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Completion returned no choices")]
    EmptyResponse,

    #[cfg(test)]
    #[error("{0}")]
    Scripted(String),
}

/// Chat completion backend
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete a full conversation and return the assistant's reply
    async fn complete_chat(&self, messages: Vec<ChatMessage>) -> Result<String, CompletionError>;

    /// Complete a single user message under a system prompt
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, CompletionError> {
        self.complete_chat(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_text),
        ])
        .await
    }
}

pub use openai::OpenAiClient;
