//! Request batcher
//!
//! Coalesces completion requests that arrive within one batch window into a
//! single sequential dispatch against the completion client.
//!
//! - `RequestBatcher`: cheap, cloneable handle; `submit` enqueues and waits
//! - `actor`: the task that owns the queue and drains it (single-flight)
//! - `slot`: write-once outcome delivery with a fallback on drop
//!
//! There is no cancellation: a submitted request always reaches the client
//! (unless its kind is unknown), even if the caller stops waiting.

mod actor;
mod slot;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::completion::CompletionClient;
use crate::prompts::PromptTable;
use actor::BatchActor;
use slot::OutcomeSlot;

/// Default batch window in milliseconds
pub const DEFAULT_BATCH_WINDOW_MS: u64 = 100;

/// Reply for a request whose kind has no system prompt
pub const UNSUPPORTED_KIND_REPLY: &str = "Unknown query type";

/// Batcher configuration
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// How long requests accumulate after the first one of a batch arrives
    pub window: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_BATCH_WINDOW_MS),
        }
    }
}

/// What the drain wrote into a request's slot
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Completion text
    Completed(String),
    /// No system prompt for the request's kind; the client was not called
    UnsupportedKind,
    /// The completion call failed (or the request was abandoned)
    Failed(String),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Error: {0}")]
    RequestFailed(String),

    #[error("Request batcher is not running")]
    Closed,
}

/// A request waiting in the queue
pub(crate) struct PendingRequest {
    kind: String,
    payload: String,
    submitted_at: Instant,
    slot: OutcomeSlot,
}

/// Handle to the batch actor
#[derive(Clone)]
pub struct RequestBatcher {
    mailbox: mpsc::UnboundedSender<PendingRequest>,
    batches: Arc<AtomicU64>,
}

impl RequestBatcher {
    /// Spawn the batch actor on the current runtime.
    ///
    /// The actor exits once every handle is dropped.
    pub fn spawn(
        client: Arc<dyn CompletionClient>,
        prompts: PromptTable,
        config: BatcherConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let batches = Arc::new(AtomicU64::new(0));

        let actor = BatchActor::new(
            rx,
            client,
            Arc::new(prompts),
            config.window,
            Arc::clone(&batches),
        );
        tokio::spawn(actor.run());

        Self {
            mailbox: tx,
            batches,
        }
    }

    /// Enqueue a request and wait for its outcome.
    ///
    /// Unknown kinds resolve to `UNSUPPORTED_KIND_REPLY`. A failed completion
    /// call surfaces as `BatchError::RequestFailed`.
    pub async fn submit(
        &self,
        kind: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<String, BatchError> {
        let (slot, outcome) = OutcomeSlot::new();
        let request = PendingRequest {
            kind: kind.into(),
            payload: payload.into(),
            submitted_at: Instant::now(),
            slot,
        };

        self.mailbox.send(request).map_err(|_| BatchError::Closed)?;

        match outcome.await {
            Ok(Outcome::Completed(text)) => Ok(text),
            Ok(Outcome::UnsupportedKind) => Ok(UNSUPPORTED_KIND_REPLY.to_string()),
            Ok(Outcome::Failed(message)) => Err(BatchError::RequestFailed(message)),
            Err(_) => Err(BatchError::Closed),
        }
    }

    /// Number of batches dispatched so far
    pub fn batches_dispatched(&self) -> u64 {
        self.batches.load(Ordering::SeqCst)
    }
}
