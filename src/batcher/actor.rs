//! Batch actor
//!
//! One task owns the pending queue. It waits for the first request, keeps
//! collecting until that request's window closes, then drains the batch
//! sequentially before looking at the mailbox again. Because the drain runs
//! inside this loop, at most one drain exists at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tracing::{debug, error, info, warn};

use super::{Outcome, PendingRequest};
use crate::completion::CompletionClient;
use crate::prompts::PromptTable;

pub(crate) struct BatchActor {
    mailbox: mpsc::UnboundedReceiver<PendingRequest>,
    client: Arc<dyn CompletionClient>,
    prompts: Arc<PromptTable>,
    window: Duration,
    batches: Arc<AtomicU64>,
}

impl BatchActor {
    pub(crate) fn new(
        mailbox: mpsc::UnboundedReceiver<PendingRequest>,
        client: Arc<dyn CompletionClient>,
        prompts: Arc<PromptTable>,
        window: Duration,
        batches: Arc<AtomicU64>,
    ) -> Self {
        Self {
            mailbox,
            client,
            prompts,
            window,
            batches,
        }
    }

    /// Run until every `RequestBatcher` handle is dropped
    pub(crate) async fn run(mut self) {
        while let Some(first) = self.mailbox.recv().await {
            let batch = self.collect(first).await;
            let batch_no = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
            info!("Dispatching batch #{}: size={}", batch_no, batch.len());

            // A panicking drain drops its remaining requests, whose slots
            // then deliver the fallback outcome. The actor keeps serving.
            let drain = tokio::spawn(drain(
                batch,
                Arc::clone(&self.client),
                Arc::clone(&self.prompts),
            ));
            if let Err(e) = drain.await {
                error!("Batch #{} drain aborted: {}", batch_no, e);
            }
        }
        debug!("Batcher mailbox closed, actor exiting");
    }

    /// Gather requests until the first request's window closes
    async fn collect(&mut self, first: PendingRequest) -> Vec<PendingRequest> {
        let deadline = first.submitted_at + self.window;
        let mut batch = vec![first];

        loop {
            tokio::select! {
                biased;
                _ = sleep_until(deadline) => break,
                next = self.mailbox.recv() => match next {
                    Some(request) => batch.push(request),
                    None => break,
                },
            }
        }

        // Requests that queued up while the previous batch drained, or that
        // arrived at the deadline, join this batch.
        while let Ok(request) = self.mailbox.try_recv() {
            batch.push(request);
        }

        batch
    }
}

/// Resolve every request in the batch, in order, one downstream call at a time
async fn drain(
    batch: Vec<PendingRequest>,
    client: Arc<dyn CompletionClient>,
    prompts: Arc<PromptTable>,
) {
    for request in batch {
        let PendingRequest {
            kind,
            payload,
            slot,
            ..
        } = request;

        let Some(system_prompt) = prompts.get(&kind) else {
            warn!("Unsupported request kind: {}", kind);
            slot.resolve(Outcome::UnsupportedKind);
            continue;
        };

        match client.complete(system_prompt, &payload).await {
            Ok(text) => slot.resolve(Outcome::Completed(text)),
            Err(e) => {
                warn!("Completion failed for kind {}: {}", kind, e);
                slot.resolve(Outcome::Failed(e.to_string()));
            }
        }
    }
}
