use super::silence::SilenceWatch;
use crate::pipeline::VoicePipeline;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Spoken when the caller has been quiet for `warn_after`
pub const CHECK_IN_PROMPT: &str = "Exactly say this and nothing else, 'Are you still there?'";

/// Spoken right before the monitor ends the call
pub const CLOSING_PROMPT: &str = "Exactly say this and nothing else, 'Thank you for your time'";

/// Timing and wording of the inactivity escalation
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between two silence checks
    pub check_interval: Duration,
    /// Silence gap that triggers a check-in prompt
    pub warn_after: Duration,
    /// Silence gap that ends the call
    pub close_after: Duration,
    pub check_in_prompt: String,
    pub closing_prompt: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            warn_after: Duration::from_secs(5),
            close_after: Duration::from_secs(10),
            check_in_prompt: CHECK_IN_PROMPT.to_string(),
            closing_prompt: CLOSING_PROMPT.to_string(),
        }
    }
}

/// Action taken on a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Caller is active, nothing to do
    None,
    /// Ask whether the caller is still there and keep watching
    CheckIn,
    /// Say goodbye and drain the session
    Close,
}

impl Escalation {
    /// Decide the action for a given silence gap. At most one prompt per tick.
    pub fn for_silence(gap: Duration, config: &MonitorConfig) -> Self {
        if gap >= config.close_after {
            Escalation::Close
        } else if gap >= config.warn_after {
            Escalation::CheckIn
        } else {
            Escalation::None
        }
    }
}

/// How the monitor loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Silence reached the close threshold and shutdown was requested
    Terminated,
    /// Stopped by the session before reaching the close threshold
    Cancelled,
}

/// Background loop escalating caller silence from check-in to termination
pub struct InactivityMonitor {
    config: MonitorConfig,
    pipeline: Arc<dyn VoicePipeline>,
    silence: SilenceWatch,
    cancel: CancellationToken,
}

impl InactivityMonitor {
    pub fn new(
        config: MonitorConfig,
        pipeline: Arc<dyn VoicePipeline>,
        silence: SilenceWatch,
    ) -> Self {
        Self {
            config,
            pipeline,
            silence,
            cancel: CancellationToken::new(),
        }
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> MonitorHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());

        MonitorHandle {
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run(mut self) -> MonitorOutcome {
        info!(
            "Inactivity monitor started (interval {:?}, check-in {:?}, close {:?})",
            self.config.check_interval, self.config.warn_after, self.config.close_after
        );

        let mut next_tick = Instant::now() + self.config.check_interval;
        let mut tracking = true;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                changed = self.silence.changed(), if tracking => {
                    match changed {
                        // New utterance restarts the interval from that instant
                        Ok(()) => next_tick = self.silence.last_activity() + self.config.check_interval,
                        Err(_) => {
                            debug!("Silence tracker dropped, keeping the current schedule");
                            tracking = false;
                        }
                    }
                    continue;
                }
                _ = tokio::time::sleep_until(next_tick) => {}
            }
            next_tick += self.config.check_interval;

            let gap = self.silence.silence_gap();
            match Escalation::for_silence(gap, &self.config) {
                Escalation::None => {
                    debug!("Caller active ({:.1}s since last utterance)", gap.as_secs_f64());
                }
                Escalation::CheckIn => {
                    info!("Caller silent for {:.1}s, checking in", gap.as_secs_f64());
                    if !self.speak(&self.config.check_in_prompt).await {
                        break;
                    }
                }
                Escalation::Close => {
                    info!("Caller silent for {:.1}s, ending call", gap.as_secs_f64());
                    if !self.speak(&self.config.closing_prompt).await {
                        break;
                    }
                    if let Err(e) = self.pipeline.shutdown(true).await {
                        warn!("Failed to request shutdown after inactivity: {:#}", e);
                    }
                    info!("Inactivity monitor terminated the call");
                    return MonitorOutcome::Terminated;
                }
            }
        }

        info!("Inactivity monitor cancelled");
        MonitorOutcome::Cancelled
    }

    /// Speak a prompt unless cancelled first. Returns false when cancelled.
    ///
    /// Reply failures are logged and do not stop the loop.
    async fn speak(&self, prompt: &str) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            result = self.pipeline.generate_reply(prompt, true) => {
                if let Err(e) = result {
                    warn!("Inactivity prompt failed: {:#}", e);
                }
                true
            }
        }
    }
}

/// Handle to a running [`InactivityMonitor`]
#[derive(Debug)]
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<MonitorOutcome>>>,
}

impl MonitorHandle {
    /// Stop the loop. Safe to call any number of times, including after the
    /// loop finished on its own.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Cancelling inactivity monitor");
        }
        self.cancel.cancel();
    }

    /// Guard that stops the loop when dropped, e.g. with an abandoned call future
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        match self.task.lock() {
            Ok(task) => task.as_ref().map_or(true, |t| t.is_finished()),
            Err(_) => true,
        }
    }

    /// Wait for the loop to stop. Returns `None` if it was already awaited.
    pub async fn wait(&self) -> Result<Option<MonitorOutcome>> {
        let task = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => None,
        };

        match task {
            Some(task) => {
                let outcome = task.await.context("Inactivity monitor panicked")?;
                Ok(Some(outcome))
            }
            None => Ok(None),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
