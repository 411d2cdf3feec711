//! Call session management
//!
//! This module provides the `CallSession` abstraction that manages:
//! - Joining the room and reading the caller's attributes
//! - Agent configuration and greeting
//! - The inactivity monitor
//! - Close handling and post-call analytics

mod config;
mod participant;
mod session;
mod setup;
mod shutdown;
mod stats;

pub use config::SessionConfig;
pub use participant::{CallerCredentials, ACCESS_TOKEN_ATTRIBUTE, AGENT_ID_ATTRIBUTE};
pub use session::{CallSession, SessionServices};
pub use setup::{
    build_profile, compose_instructions, format_bookings, prepare_agent, AgentProfile, Greeting,
    DEFAULT_GREETING, DEFAULT_INSTRUCTIONS,
};
pub use shutdown::{CallReport, CloseLatch, ShutdownHandler};
pub use stats::{CallState, CallStats, CallTiming, CompletedCall};
