use super::participant::CallerCredentials;
use crate::backend::{AgentConfig, AgentDirectory, CalendarBooking, InitiationMode};
use crate::error::CallError;
use anyhow::Result;
use chrono::{DateTime, Local};
use tracing::{info, warn};

/// Greeting spoken in the dynamic initiation mode
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Persona used when the agent has no instructions of its own
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful, friendly voice AI assistant with a warm and engaging personality.
You assist users with their questions and requests using your extensive knowledge.
Keep your responses concise, natural, and conversational.
Avoid complex formatting, emojis, or special punctuation.
If the user asks to end the call or says goodbye, call the end_call tool.
Do not say goodbye yourself, the tool will speak and end the call.
Note: If the user doesn't respond for 5 seconds, you will prompt them.
If they remain silent for 10 seconds total, the call will end.";

/// How the call opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Greeting {
    /// Speak [`DEFAULT_GREETING`]
    Fixed,
    /// Speak the agent's configured opening line
    Custom(String),
    /// Say nothing until the caller speaks
    CallerFirst,
}

impl Greeting {
    pub fn resolve(mode: InitiationMode, initial_message: Option<&str>) -> Self {
        match mode {
            InitiationMode::AiInitiatesDynamic => Greeting::Fixed,
            InitiationMode::AiInitiatesDefined => match initial_message.map(str::trim) {
                Some(message) if !message.is_empty() => Greeting::Custom(message.to_string()),
                _ => {
                    warn!("Defined initiation mode without an initial message, waiting for caller");
                    Greeting::CallerFirst
                }
            },
            InitiationMode::UserInitiates => Greeting::CallerFirst,
        }
    }

    /// Reply instructions to speak, `None` when the caller goes first
    pub fn instructions(&self) -> Option<&str> {
        match self {
            Greeting::Fixed => Some(DEFAULT_GREETING),
            Greeting::Custom(message) => Some(message.as_str()),
            Greeting::CallerFirst => None,
        }
    }
}

/// Ready-to-run agent for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub instructions: String,
    pub voice: String,
    pub greeting: Greeting,
    pub knowledge_base: bool,
}

/// Fetch and prepare the agent the caller dialled
///
/// Configuration failures are fatal; calendar failures only drop the bookings section.
pub async fn prepare_agent(
    directory: &dyn AgentDirectory,
    credentials: &CallerCredentials,
) -> Result<AgentProfile> {
    let config = directory
        .fetch_agent_config(&credentials.access_token, credentials.agent_id)
        .await?;

    let bookings = match directory.fetch_calendar_events(&credentials.access_token).await {
        Ok(bookings) => bookings,
        Err(e) => {
            warn!("Calendar events unavailable: {:#}", e);
            Vec::new()
        }
    };

    let profile = build_profile(config, &bookings, Local::now())?;
    info!("Instructions processed, agent ready (voice {})", profile.voice);
    Ok(profile)
}

pub fn build_profile(
    config: AgentConfig,
    bookings: &[CalendarBooking],
    now: DateTime<Local>,
) -> Result<AgentProfile, CallError> {
    if config.voice_model_name.trim().is_empty() {
        return Err(CallError::InvalidAgentConfig(
            "voiceModelName must not be empty".to_string(),
        ));
    }

    let greeting = Greeting::resolve(config.initiation_mode, config.initial_message.as_deref());

    Ok(AgentProfile {
        instructions: compose_instructions(&config.instructions.to_text(), bookings, now),
        voice: config.voice_model_name,
        greeting,
        knowledge_base: config.knowledge_base_trigger.unwrap_or(false),
    })
}

/// Prefix the instructions with the current time and upcoming bookings
pub fn compose_instructions(
    base: &str,
    bookings: &[CalendarBooking],
    now: DateTime<Local>,
) -> String {
    let base = if base.trim().is_empty() {
        DEFAULT_INSTRUCTIONS
    } else {
        base
    };

    let instructions = format!(
        "Current date and time: {}\n\n{}",
        now.format("%Y-%m-%d %H:%M:%S"),
        base
    );

    let calendar = format_bookings(bookings);
    if calendar.is_empty() {
        instructions
    } else {
        format!("{}\n\n{}", calendar, instructions)
    }
}

/// Bookings section for the prompt, empty when there are none
pub fn format_bookings(bookings: &[CalendarBooking]) -> String {
    if bookings.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "## Upcoming Bookings (do not double-book these times):".to_string(),
        String::new(),
    ];

    for booking in bookings {
        lines.push(format!(
            "- {} | {} - {} | {}",
            booking.title.as_deref().unwrap_or("Unknown Event"),
            booking.start_time.as_deref().unwrap_or("TBD"),
            booking.end_time.as_deref().unwrap_or("TBD"),
            booking.provider.as_deref().unwrap_or("Unknown"),
        ));
    }
    lines.push(String::new());

    lines.join("\n")
}
