pub mod backend;

pub use backend::{
    AgentSpec, AudioOptions, CloseReason, NoiseCancellation, Participant, ParticipantKind,
    PipelineConnector, SessionEvent, SessionReport, ToolInvocation, ToolSpec, VoicePipeline,
};
