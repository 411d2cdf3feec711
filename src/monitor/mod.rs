//! Caller inactivity detection
//!
//! The conversation observer writes the time of each user utterance into a
//! [`SilenceTracker`]; the [`InactivityMonitor`] wakes on a fixed interval,
//! reads the silence gap and escalates:
//! - gap >= warn threshold: speak a check-in prompt and keep watching
//! - gap >= close threshold: speak a closing notice, drain the session, stop

mod inactivity;
mod silence;

pub use inactivity::{
    Escalation, InactivityMonitor, MonitorConfig, MonitorHandle, MonitorOutcome, CHECK_IN_PROMPT,
    CLOSING_PROMPT,
};
pub use silence::{SilenceTracker, SilenceWatch};
