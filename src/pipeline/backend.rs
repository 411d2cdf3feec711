use crate::conversation::ConversationItem;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{mpsc, oneshot};

/// Kind of participant that joined the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Standard,
    Sip,
    Agent,
    Ingress,
    Egress,
    Connector,
}

/// Remote caller as announced by the room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub identity: String,
    pub kind: ParticipantKind,
    /// Caller-provided attributes (access token, agent id, ...)
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Noise cancellation profile applied to caller audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseCancellation {
    /// Tuned for narrow-band phone audio
    Telephony,
    Standard,
}

/// Audio options passed when the voice session starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioOptions {
    pub noise_cancellation: NoiseCancellation,
    pub delete_room_on_close: bool,
}

impl AudioOptions {
    /// SIP callers get the telephony profile, everyone else the standard one
    pub fn for_participant(participant: &Participant) -> Self {
        let noise_cancellation = match participant.kind {
            ParticipantKind::Sip => NoiseCancellation::Telephony,
            _ => NoiseCancellation::Standard,
        };

        Self {
            noise_cancellation,
            delete_room_on_close: true,
        }
    }
}

/// Function tool the assistant may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// Everything the pipeline needs to run the conversational assistant
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub instructions: String,
    pub voice: String,
    pub tools: Vec<ToolSpec>,
}

/// A tool call issued by the assistant, answered through `responder`
#[derive(Debug)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub responder: oneshot::Sender<Value>,
}

/// Why the session closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The pipeline reported the session closed
    Closed(Option<String>),
    /// The event stream ended without a close event
    TransportLost,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Closed(Some(reason)) => write!(f, "closed ({})", reason),
            CloseReason::Closed(None) => f.write_str("closed"),
            CloseReason::TransportLost => f.write_str("transport lost"),
        }
    }
}

/// Event emitted by a running voice session
#[derive(Debug)]
pub enum SessionEvent {
    ConversationItemAdded(ConversationItem),
    ToolCall(ToolInvocation),
    Close(CloseReason),
}

/// Final state of the session, produced once at shutdown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(default)]
    pub chat_history: Vec<ConversationItem>,
}

/// Room transport and voice pipeline (STT, LLM, TTS, VAD, turn detection)
///
/// Implementations:
/// - NATS: talks to the external media pipeline over `call.{id}.*` subjects
/// - Test doubles in `tests/common`
#[async_trait::async_trait]
pub trait VoicePipeline: Send + Sync {
    /// Join the room
    async fn connect(&self) -> Result<()>;

    /// Wait until the remote caller is present
    async fn wait_for_participant(&self) -> Result<Participant>;

    /// Subscribe to session events
    ///
    /// May be called once; events published before subscribing are lost.
    async fn subscribe_events(&self) -> Result<mpsc::Receiver<SessionEvent>>;

    /// Start the conversational assistant
    async fn start(&self, agent: &AgentSpec, options: &AudioOptions) -> Result<()>;

    /// Speak a reply generated from `instructions`, returning once it has been spoken
    async fn generate_reply(&self, instructions: &str, allow_interruptions: bool) -> Result<()>;

    /// Request the session to close; with `drain` in-flight speech finishes first
    async fn shutdown(&self, drain: bool) -> Result<()>;

    /// Snapshot of the conversation history
    async fn make_session_report(&self) -> Result<SessionReport>;

    /// Pipeline name for logging
    fn name(&self) -> &str;
}

/// Opens a [`VoicePipeline`] for a call id
#[async_trait::async_trait]
pub trait PipelineConnector: Send + Sync {
    async fn open(&self, call_id: &str) -> Result<std::sync::Arc<dyn VoicePipeline>>;
}
