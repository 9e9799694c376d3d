//! Broadcast channel for upload progress.
//!
//! The channel is constructed with the orchestrator and injected wherever
//! progress is reported or consumed; there is no global registry. Delivery
//! is best-effort and never a correctness dependency.

use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted while an upload batch runs.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// Cumulative bytes processed so far, against the batch total.
    Progress {
        uploaded_bytes: u64,
        total_bytes: u64,
    },
    /// One file finished ingesting; its photo row is committed.
    FileComplete { filename: String, photo_id: Uuid },
}

/// Cloneable broadcast handle for upload progress.
#[derive(Clone)]
pub struct ProgressChannel {
    sender: broadcast::Sender<UploadEvent>,
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event. Send errors (no receivers) are ignored.
    pub fn emit(&self, event: UploadEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.sender.subscribe()
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(256)
    }
}
