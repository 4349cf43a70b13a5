use serde::Serialize;
use std::fmt;

use crate::error::TransportError;
use crate::notify::Alert;

const QUICKSTART_GUIDE_URL: &str = "https://docs.livekit.io/agents/start/voice-ai/";

/// Why a session attempt ended in failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    Credential(String),
    Transport(String),
    Device(String),
    /// The agent never joined the room before the liveness timeout
    AgentAbsent,
    /// The agent joined but never reached a ready state
    AgentIncomplete,
}

impl FailureReason {
    pub fn alert(&self) -> Alert {
        match self {
            FailureReason::Credential(message) => {
                Alert::new("There was an error fetching connection details", message.clone())
            }
            FailureReason::Transport(message) => {
                Alert::new("There was an error connecting to the agent", message.clone())
            }
            FailureReason::Device(message) => {
                Alert::new("Encountered an error with your media devices", message.clone())
            }
            FailureReason::AgentAbsent => {
                Alert::new("Session ended", "Agent did not join the room.")
                    .with_link("See quickstart guide", QUICKSTART_GUIDE_URL)
            }
            FailureReason::AgentIncomplete => Alert::new(
                "Session ended",
                "Agent connected but did not complete initializing.",
            )
            .with_link("See quickstart guide", QUICKSTART_GUIDE_URL),
        }
    }
}

impl From<&TransportError> for FailureReason {
    fn from(error: &TransportError) -> Self {
        match error {
            TransportError::Device { .. } => FailureReason::Device(error.to_string()),
            _ => FailureReason::Transport(error.to_string()),
        }
    }
}

/// Lifecycle of the widget's single session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AcquiringCredentials,
    Connecting,
    AwaitingAgent,
    Active,
    Disconnecting,
    /// Transient: always followed by teardown and `Idle`
    Failed(FailureReason),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AcquiringCredentials => "acquiring_credentials",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingAgent => "awaiting_agent",
            SessionState::Active => "active",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Failed(_) => "failed",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Room joined and microphone live
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::AwaitingAgent | SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Failed(reason) => write!(f, "failed ({:?})", reason),
            other => f.write_str(other.name()),
        }
    }
}
