pub mod backend;
pub mod classify;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod inference;
pub mod knowledge;
pub mod monitor;
pub mod nats;
pub mod pipeline;
pub mod session;
pub mod tools;

pub use backend::{AgentDirectory, AnalyticsSender, BackendClient, CallMetadata, ChunkIndex};
pub use classify::{CallClassification, CallClassifier};
pub use config::Config;
pub use conversation::{build_transcript, ConversationItem, Role};
pub use error::CallError;
pub use http::{create_router, AppState, CallLauncher};
pub use inference::{Embedder, InferenceService, OpenAiClient};
pub use knowledge::KnowledgeBase;
pub use monitor::{InactivityMonitor, MonitorConfig, MonitorHandle, MonitorOutcome};
pub use nats::{NatsConnector, NatsVoicePipeline};
pub use pipeline::{
    AgentSpec, AudioOptions, CloseReason, Participant, PipelineConnector, SessionEvent,
    SessionReport, VoicePipeline,
};
pub use session::{
    CallReport, CallSession, CallState, CallStats, CallerCredentials, SessionConfig,
    SessionServices,
};
pub use tools::ToolBox;
