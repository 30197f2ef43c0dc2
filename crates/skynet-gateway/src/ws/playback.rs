//! Playback manager (§4.6 "Playback manager"): owns the ordered buffer of
//! model-spoken PCM blocks awaiting delivery to the client, and the single
//! playback task that drains it. `interrupt` (model-side barge-in or a
//! client-sent `{"interrupt":true}`) clears the buffer, cancels whatever
//! playback task is running, and sends one interrupt marker frame.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message as WsMessage;
use skynet_protocol::ServerFrame;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

struct Inner {
    buffer: Mutex<VecDeque<String>>,
    task: Mutex<Option<JoinHandle<()>>>,
    client_tx: mpsc::Sender<WsMessage>,
}

/// Shared handle cloned into the downlink task and the reader task (which
/// only ever calls `interrupt`).
#[derive(Clone)]
pub struct PlaybackManager {
    inner: Arc<Inner>,
}

impl PlaybackManager {
    pub fn new(client_tx: mpsc::Sender<WsMessage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                buffer: Mutex::new(VecDeque::new()),
                task: Mutex::new(None),
                client_tx,
            }),
        }
    }

    /// Enqueue one PCM block for playback; starts the drain task if none is
    /// currently running (§4.6: "on any new arrival, start a single
    /// playback task if none is running").
    pub async fn push(&self, chunk_b64: String) {
        self.inner.buffer.lock().await.push_back(chunk_b64);
        self.ensure_running().await;
    }

    async fn ensure_running(&self) {
        let mut task = self.inner.task.lock().await;
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let inner = self.inner.clone();
        *task = Some(tokio::spawn(async move { drain(inner).await }));
    }

    /// Flush the buffer, cancel the running playback task, and send one
    /// interrupt marker — used for both a client-originated interrupt and a
    /// model-reported barge-in (§4.6, §5 "Ordering guarantees").
    pub async fn interrupt(&self) {
        self.inner.buffer.lock().await.clear();
        if let Some(handle) = self.inner.task.lock().await.take() {
            handle.abort();
        }
        if self
            .inner
            .client_tx
            .send(frame_message(&ServerFrame::interrupt()))
            .await
            .is_err()
        {
            warn!("client channel closed while sending interrupt marker");
        }
    }

    /// Whether playback still has work outstanding — buffered chunks or a
    /// live drain task.
    pub async fn busy(&self) -> bool {
        if !self.inner.buffer.lock().await.is_empty() {
            return true;
        }
        self.inner
            .task
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Wait for playback to go idle, bounded by `ceiling` (§5 "End-of-
    /// conversation drain: bounded by 10 s").
    pub async fn drain(&self, ceiling: Duration) {
        let deadline = Instant::now() + ceiling;
        while self.busy().await {
            if Instant::now() >= deadline {
                warn!("playback drain ceiling reached with residual buffer");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

async fn drain(inner: Arc<Inner>) {
    loop {
        let next = inner.buffer.lock().await.pop_front();
        let Some(chunk) = next else { break };
        let frame = ServerFrame::audio(chunk);
        if inner.client_tx.send(frame_message(&frame)).await.is_err() {
            break;
        }
    }
}

fn frame_message(frame: &ServerFrame) -> WsMessage {
    WsMessage::Text(frame.to_json().unwrap_or_default().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_then_drain_delivers_chunks_in_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let playback = PlaybackManager::new(tx);
        playback.push("chunk-a".to_string()).await;
        playback.push("chunk-b".to_string()).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, WsMessage::Text(t) if t.contains("chunk-a")));
        assert!(matches!(second, WsMessage::Text(t) if t.contains("chunk-b")));
    }

    #[tokio::test]
    async fn interrupt_clears_buffer_and_sends_marker() {
        let (tx, mut rx) = mpsc::channel(16);
        let playback = PlaybackManager::new(tx);
        playback.push("chunk-a".to_string()).await;
        playback.interrupt().await;

        // The marker frame must appear; no guarantee the buffered chunk
        // beat the interrupt to the channel, but the buffer itself must be
        // empty afterwards.
        assert!(!playback.busy().await);
        let mut saw_interrupt = false;
        while let Ok(msg) = rx.try_recv() {
            if matches!(&msg, WsMessage::Text(t) if t.contains("\"interrupt\":true")) {
                saw_interrupt = true;
            }
        }
        assert!(saw_interrupt);
    }

    #[tokio::test]
    async fn drain_returns_once_buffer_empties() {
        let (tx, _rx) = mpsc::channel(16);
        let playback = PlaybackManager::new(tx);
        playback.push("chunk-a".to_string()).await;
        playback.drain(Duration::from_secs(2)).await;
        assert!(!playback.busy().await);
    }
}
