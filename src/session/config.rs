use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the session controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Start buffering microphone audio before the room connection is
    /// confirmed, so speech during connection setup is not lost
    pub is_pre_connect_buffer_enabled: bool,

    /// How long a connected session waits for the agent to become ready
    /// Default: 10 seconds
    pub liveness_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            is_pre_connect_buffer_enabled: true,
            liveness_timeout: Duration::from_secs(10),
        }
    }
}
