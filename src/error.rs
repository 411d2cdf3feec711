use thiserror::Error;

/// Failures that stop a call session before it starts
#[derive(Error, Debug)]
pub enum CallError {
    #[error("Participant attribute '{0}' is required")]
    MissingAttribute(&'static str),

    #[error("Participant attribute '{name}' is invalid: {value:?}")]
    InvalidAttribute { name: &'static str, value: String },

    #[error("Invalid agent configuration: {0}")]
    InvalidAgentConfig(String),

    #[error("Call session {0} was already started")]
    AlreadyStarted(String),
}
