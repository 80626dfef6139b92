//! Write-once outcome slot

use tokio::sync::oneshot;

use super::Outcome;

/// Message delivered when a request is dropped without being resolved
pub const ABANDONED_MESSAGE: &str = "request dropped before completion";

/// Sending half of a request's outcome.
///
/// `resolve` consumes the slot, so it can be written at most once. A slot
/// dropped unresolved (panic, shutdown) writes `Outcome::Failed` instead, so
/// the submitter is never left waiting.
pub(crate) struct OutcomeSlot {
    tx: Option<oneshot::Sender<Outcome>>,
}

impl OutcomeSlot {
    pub(crate) fn new() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub(crate) fn resolve(mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            // Receiver gone means the caller stopped waiting; nothing to do.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for OutcomeSlot {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Outcome::Failed(ABANDONED_MESSAGE.to_string()));
        }
    }
}
