use crate::classify::{CalendarEvent, CallClassification, CallbackRequired, IsSpam, ServicePricing};
use crate::session::CompletedCall;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who speaks first when the call connects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitiationMode {
    #[serde(rename = "User Initiates")]
    UserInitiates,
    #[default]
    #[serde(rename = "AI Initiates (Dynamic Message)")]
    AiInitiatesDynamic,
    #[serde(rename = "AI Initiates (Defined Message)")]
    AiInitiatesDefined,
}

/// Agent instructions, stored either as one block or as separate lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instructions {
    Text(String),
    Lines(Vec<Option<String>>),
}

impl Instructions {
    /// Flatten to a single block; null lines are dropped
    pub fn to_text(&self) -> String {
        match self {
            Instructions::Text(text) => text.clone(),
            Instructions::Lines(lines) => lines
                .iter()
                .flatten()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Default for Instructions {
    fn default() -> Self {
        Instructions::Text(String::new())
    }
}

/// Agent configuration served by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub voice_model_name: String,
    #[serde(default)]
    pub initiation_mode: InitiationMode,
    #[serde(default)]
    pub knowledge_base_trigger: Option<bool>,
    #[serde(default)]
    pub initial_message: Option<String>,
    pub instructions: Instructions,
}

/// Existing booking the assistant must not double-book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarBooking {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "start")]
    pub start_time: Option<String>,
    #[serde(default, alias = "end")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Knowledge base passage returned by vector search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub content: String,
    #[serde(default)]
    pub similarity_score: f64,
}

/// Analytics record submitted once per classified call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetadata {
    pub datetime: DateTime<Utc>,
    pub call_duration: Option<i64>,
    pub call_transcript: Option<String>,
    pub is_spam: Option<IsSpam>,
    pub reason_for_call: Option<String>,
    pub callback_required: Option<CallbackRequired>,
    pub callback_required_reason: Option<String>,
    pub caller_name: Option<String>,
    pub is_active: Option<bool>,
    pub calendar_event: Option<CalendarEvent>,
    pub service_pricing: Option<ServicePricing>,
}

impl CallMetadata {
    /// Combine a closed call, its transcript and its classification
    pub fn new(
        call: &CompletedCall,
        transcript: String,
        classification: CallClassification,
    ) -> Self {
        Self {
            datetime: Utc::now(),
            call_duration: Some(call.rounded_seconds()),
            call_transcript: Some(transcript),
            is_spam: Some(classification.is_spam),
            reason_for_call: Some(classification.reason_for_call),
            callback_required: Some(classification.callback_required),
            callback_required_reason: Some(classification.callback_required_reason),
            caller_name: classification.caller_name,
            is_active: None,
            calendar_event: classification.calendar_event,
            service_pricing: classification.service_pricing,
        }
    }
}
