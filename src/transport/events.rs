use serde::{Deserialize, Serialize};

/// Activity phase reported by the remote agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentPresence {
    #[default]
    Disconnected,
    Connecting,
    Initializing,
    Listening,
    Thinking,
    Speaking,
}

impl AgentPresence {
    /// Whether the agent has finished joining and can hold a conversation
    pub fn is_ready(self) -> bool {
        matches!(
            self,
            AgentPresence::Listening | AgentPresence::Thinking | AgentPresence::Speaking
        )
    }
}

/// The participant this client joined as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalParticipant {
    pub identity: String,
    pub name: Option<String>,
}

/// Another participant in the room (usually the agent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParticipant {
    pub identity: String,
    pub name: Option<String>,
}

/// A discrete chat message, sent or received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageEvent {
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub text: String,
    pub participant_identity: String,
}

/// Speech-to-text output for one utterance.
///
/// Fragments of the same utterance share a `stream_id`; `text` holds the
/// utterance so far and replaces whatever an earlier fragment carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionStreamEvent {
    pub stream_id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub text: String,
    pub participant_identity: String,
}

/// Everything the transport reports back to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Disconnected,
    MediaDevicesError { name: String, message: String },
    AgentPresenceChanged(AgentPresence),
    ParticipantConnected(RemoteParticipant),
    ParticipantDisconnected { identity: String },
    ChatMessage(ChatMessageEvent),
    Transcription(TranscriptionStreamEvent),
}
