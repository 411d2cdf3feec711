use crate::conversation::ConversationItem;
use crate::pipeline::{AgentSpec, AudioOptions, NoiseCancellation, ToolSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Published on `call.{id}.join` to ask the media pipeline to join the room
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinMessage {
    pub call_id: String,
    pub agent_name: String,
    pub timestamp: String, // RFC3339 timestamp
}

/// Published on `call.{id}.start` to start the conversational assistant
#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionMessage {
    pub instructions: String,
    pub voice: String,
    pub tools: Vec<ToolSpec>,
    pub noise_cancellation: NoiseCancellation,
    pub delete_room_on_close: bool,
}

impl StartSessionMessage {
    pub fn new(agent: &AgentSpec, options: &AudioOptions) -> Self {
        Self {
            instructions: agent.instructions.clone(),
            voice: agent.voice.clone(),
            tools: agent.tools.clone(),
            noise_cancellation: options.noise_cancellation,
            delete_room_on_close: options.delete_room_on_close,
        }
    }
}

/// Request on `call.{id}.reply`; answered once the reply has been spoken
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateReplyMessage {
    pub instructions: String,
    pub allow_interruptions: bool,
}

/// Acknowledgement for requests that return no data
#[derive(Debug, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_ok() -> bool {
    true
}

/// Published on `call.{id}.shutdown`
#[derive(Debug, Serialize, Deserialize)]
pub struct ShutdownMessage {
    pub drain: bool,
}

/// Event received on `call.{id}.events`
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventMessage {
    ConversationItemAdded {
        item: ConversationItem,
    },
    /// Answered on the message's reply subject
    ToolCall {
        name: String,
        #[serde(default)]
        arguments: Value,
    },
    Close {
        #[serde(default)]
        reason: Option<String>,
    },
}

