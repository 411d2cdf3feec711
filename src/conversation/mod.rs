//! Conversation history types and the transcript derived from them

mod item;
mod transcript;

pub use item::{ConversationItem, Role};
pub use transcript::build_transcript;
