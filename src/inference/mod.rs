pub mod client;
pub mod messages;

pub use client::{ContentStream, Embedder, InferenceService, OpenAiClient};
pub use messages::{ChatMessage, ChatRequest, ChatRole, ResponseFormat};
