use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatMessage, CompletionClient, CompletionError};

/// A recorded call to the mock client
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub messages: Vec<ChatMessage>,
    pub at: tokio::time::Instant,
}

/// A scripted completion client for tests.
///
/// Replies with `"<prefix><last user message>"`, or fails when the last
/// message contains `fail_marker`. Every call is recorded in order.
pub struct MockCompletion {
    prefix: String,
    fail_marker: Option<String>,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockCompletion {
    pub fn echo(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            fail_marker: None,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The user message of every call, in dispatch order
    pub fn user_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl CompletionClient for MockCompletion {
    async fn complete_chat(&self, messages: Vec<ChatMessage>) -> Result<String, CompletionError> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.calls.lock().unwrap().push(RecordedCall {
            messages,
            at: tokio::time::Instant::now(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match &self.fail_marker {
            Some(marker) if last.contains(marker.as_str()) => {
                Err(CompletionError::Scripted(format!("scripted failure for {}", last)))
            }
            _ => Ok(format!("{}{}", self.prefix, last)),
        }
    }
}
