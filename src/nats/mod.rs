pub mod client;
pub mod messages;

pub use client::{NatsConnector, NatsVoicePipeline};
pub use messages::{
    AckMessage, EventMessage, GenerateReplyMessage, JoinMessage, ShutdownMessage,
    StartSessionMessage,
};
