//! Cancellable handle for one in-flight background phase.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared between the editor owner (which may cancel) and the worker task
/// (which checks for cancellation at its own boundaries).
#[derive(Clone, Debug)]
pub struct Activity {
    description: Arc<str>,
    cancelled: Arc<watch::Sender<bool>>,
}

impl Activity {
    pub fn new(description: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(false);
        Activity {
            description: Arc::from(description.into()),
            cancelled: Arc::new(tx),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once [`Activity::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
