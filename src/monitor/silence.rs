use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Write side of the silence state, owned by the conversation observer.
///
/// Each user turn publishes a fresh timestamp; readers never block the writer.
#[derive(Debug)]
pub struct SilenceTracker {
    tx: watch::Sender<Instant>,
}

impl SilenceTracker {
    /// Create a tracker whose last activity is now
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Instant::now());
        Self { tx }
    }

    /// Record a user utterance at the current instant
    pub fn record_activity(&self) {
        self.tx.send_replace(Instant::now());
    }

    /// Read handle for the monitor
    pub fn watch(&self) -> SilenceWatch {
        SilenceWatch {
            rx: self.tx.subscribe(),
        }
    }

    pub fn last_activity(&self) -> Instant {
        *self.tx.borrow()
    }
}

impl Default for SilenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the silence state
#[derive(Debug, Clone)]
pub struct SilenceWatch {
    rx: watch::Receiver<Instant>,
}

impl SilenceWatch {
    pub fn last_activity(&self) -> Instant {
        *self.rx.borrow()
    }

    /// Wait for the next recorded utterance. Errors once the tracker is gone.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }

    /// Time since the last recorded user utterance
    pub fn silence_gap(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_activity())
    }
}
