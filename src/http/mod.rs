//! HTTP API server for external control
//!
//! This module provides a REST API for controlling call sessions:
//! - POST /calls - Start a session for a call
//! - GET /calls - List active calls
//! - GET /calls/:id/status - Query call status
//! - POST /calls/:id/end - End a call
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, StartCallRequest, StartCallResponse};
pub use routes::create_router;
pub use state::{AppState, CallLauncher};
