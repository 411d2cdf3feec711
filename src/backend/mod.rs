pub mod client;
pub mod messages;

pub use client::{AgentDirectory, AnalyticsSender, BackendClient, ChunkIndex};
pub use messages::{
    AgentConfig, CalendarBooking, CallMetadata, InitiationMode, Instructions, KnowledgeChunk,
};
