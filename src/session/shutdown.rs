use super::participant::CallerCredentials;
use super::stats::CompletedCall;
use crate::backend::{AnalyticsSender, CallMetadata};
use crate::classify::{CallClassification, CallClassifier};
use crate::conversation::build_transcript;
use crate::pipeline::{CloseReason, SessionReport};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// One-shot close signal. The first reason wins; later signals are ignored.
#[derive(Debug)]
pub struct CloseLatch {
    tx: watch::Sender<Option<CloseReason>>,
}

impl CloseLatch {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Close the latch and return the reason that actually closed it
    pub fn close(&self, reason: CloseReason) -> CloseReason {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });

        self.reason().unwrap_or(CloseReason::TransportLost)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<CloseReason> {
        self.tx.borrow().as_ref().cloned()
    }

    /// Resolve once the latch is closed
    pub async fn closed(&self) -> CloseReason {
        let mut rx = self.tx.subscribe();
        loop {
            let current = rx.borrow_and_update().as_ref().cloned();
            if let Some(reason) = current {
                return reason;
            }
            // The sender lives in `self`, so this only errors during teardown
            if rx.changed().await.is_err() {
                return CloseReason::TransportLost;
            }
        }
    }
}

impl Default for CloseLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a finished call
#[derive(Debug, Clone, Serialize)]
pub struct CallReport {
    pub call_id: String,
    pub close_reason: CloseReason,
    pub duration_secs: f64,
    pub transcript: String,
    pub classification: Option<CallClassification>,
    pub analytics_sent: bool,
}

/// Post-call processing: transcript, classification, analytics
pub struct ShutdownHandler {
    credentials: CallerCredentials,
    classifier: Arc<CallClassifier>,
    analytics: Option<Arc<dyn AnalyticsSender>>,
}

impl ShutdownHandler {
    pub fn new(
        credentials: CallerCredentials,
        classifier: Arc<CallClassifier>,
        analytics: Option<Arc<dyn AnalyticsSender>>,
    ) -> Self {
        Self {
            credentials,
            classifier,
            analytics,
        }
    }

    /// Runs to completion; every failure is logged and absorbed
    pub async fn run(
        self,
        call_id: &str,
        close_reason: CloseReason,
        call: CompletedCall,
        report: SessionReport,
    ) -> CallReport {
        info!(
            "Running post-call processing for {} (duration {:.1}s)",
            call_id,
            call.duration_seconds()
        );

        let transcript = build_transcript(&report.chat_history);
        let classification = self.classifier.classify_transcript(&transcript).await;

        let mut analytics_sent = false;
        match &classification {
            Some(classification) => {
                let metadata = CallMetadata::new(&call, transcript.clone(), classification.clone());
                analytics_sent = self.send(&metadata).await;
            }
            None => info!("No classification generated for session {}", call_id),
        }

        CallReport {
            call_id: call_id.to_string(),
            close_reason,
            duration_secs: call.duration_seconds(),
            transcript,
            classification,
            analytics_sent,
        }
    }

    async fn send(&self, metadata: &CallMetadata) -> bool {
        let Some(sender) = &self.analytics else {
            info!("Analytics backend not configured, skipping submission");
            return false;
        };

        match sender
            .send_call_analytics(&self.credentials.access_token, metadata)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Call analytics not delivered: {:#}", e);
                false
            }
        }
    }
}
