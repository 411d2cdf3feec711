use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Lifecycle state of a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// Joining the room and waiting for the caller
    Connecting,
    /// Conversation in progress
    Active,
    /// Closed, post-call processing running
    Closing,
    Ended,
    /// Session setup failed
    Failed,
}

/// Start and end of a call.
///
/// `ended_at` and `duration_seconds` are set once, when the session closes.
#[derive(Debug, Clone)]
pub struct CallTiming {
    started_at: DateTime<Utc>,
    started: Instant,
    completed: Option<CompletedCall>,
}

impl CallTiming {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            completed: None,
        }
    }

    /// Freeze the call duration. Later calls return the first result.
    pub fn finish(&mut self) -> CompletedCall {
        if let Some(completed) = self.completed {
            return completed;
        }

        let duration = self.started.elapsed();
        let ended_at = self.started_at
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());

        let completed = CompletedCall {
            started_at: self.started_at,
            ended_at,
            duration,
        };
        self.completed = Some(completed);
        completed
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.completed.map(|c| c.ended_at)
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.completed.map(|c| c.duration_seconds())
    }

    /// Time since start, or the frozen duration once finished
    pub fn elapsed(&self) -> Duration {
        match self.completed {
            Some(completed) => completed.duration,
            None => self.started.elapsed(),
        }
    }
}

/// Timing of a call that has closed. Only obtainable from [`CallTiming::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedCall {
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration: Duration,
}

impl CompletedCall {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    pub fn rounded_seconds(&self) -> i64 {
        self.duration_seconds().round() as i64
    }
}

/// Snapshot of a call session for the control API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStats {
    pub call_id: String,
    pub state: CallState,

    /// When the voice session started
    pub started_at: Option<DateTime<Utc>>,

    /// Elapsed seconds, frozen once the call closed
    pub duration_secs: Option<f64>,

    /// Conversation items observed so far
    pub conversation_items: usize,

    /// Seconds since the caller last spoke
    pub silence_secs: Option<f64>,
}
