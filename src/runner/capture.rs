//! Bounded output capture for child process pipes

use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

const CHUNK_SIZE: usize = 8192;

/// Collects a pipe into a shared buffer from a background task.
///
/// Bytes past `limit` are read and dropped so the child never blocks on a
/// full pipe. The buffer is readable at any point, which lets a timed-out run
/// keep whatever was captured before the kill.
pub(crate) struct OutputCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    /// Cleared once the reader has finished
    task: Option<JoinHandle<()>>,
}

impl OutputCapture {
    pub(crate) fn spawn<R>(reader: R, limit: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(pump(reader, Arc::clone(&buffer), limit));
        Self {
            buffer,
            task: Some(task),
        }
    }

    /// Wait until the pipe reaches EOF. Returns at once if it already has.
    ///
    /// Cancel-safe: an interrupted wait leaves the reader running, and
    /// `into_bytes` or drop still stops it.
    pub(crate) async fn closed(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
    }

    /// Stop reading and return everything captured so far
    pub(crate) fn into_bytes(mut self) -> Vec<u8> {
        self.stop();
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buffer)
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn pump<R>(mut reader: R, buffer: Arc<Mutex<Vec<u8>>>, limit: usize)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let room = limit.saturating_sub(buffer.len());
        buffer.extend_from_slice(&chunk[..n.min(room)]);
    }
}
