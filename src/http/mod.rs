//! HTTP control API for the embedding surface
//!
//! Both presentation modes (inline control and floating popup) drive the
//! same session through these endpoints:
//! - POST /session/start - Start a session
//! - POST /session/stop - Leave the session
//! - POST /session/chat - Send a chat message
//! - GET /session/status - Query session status
//! - GET /session/transcript - Get the merged transcript
//! - GET /session/alerts - Recent alerts
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
