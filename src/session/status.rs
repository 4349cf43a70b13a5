use serde::Serialize;

use super::controller::SessionHandle;
use super::state::SessionState;
use crate::transport::AgentPresence;

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Current lifecycle state
    pub session: SessionState,

    /// Last presence the agent reported
    pub agent_presence: AgentPresence,

    /// Number of entries in the merged transcript
    pub transcript_entries: usize,

    /// Whether connection details are cached for the next start
    pub credentials_cached: bool,
}

impl SessionStatus {
    pub fn capture(handle: &SessionHandle, credentials_cached: bool) -> Self {
        Self {
            session: handle.state(),
            agent_presence: handle.agent_presence(),
            transcript_entries: handle.current_entries().len(),
            credentials_cached,
        }
    }
}
