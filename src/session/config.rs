use crate::monitor::MonitorConfig;

/// Configuration for a call session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique call identifier (e.g., the room name)
    pub call_id: String,

    /// Inactivity escalation timing
    pub monitor: MonitorConfig,
}

impl SessionConfig {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(format!("call-{}", uuid::Uuid::new_v4()))
    }
}
