use serde::{Deserialize, Serialize};

use crate::transport::{ChatMessageEvent, RemoteParticipant, TranscriptionStreamEvent};

/// Who produced an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Speaker {
    /// This client
    Local { identity: String },
    /// A participant present in the room when the entry was resolved
    Remote(RemoteParticipant),
}

impl Speaker {
    pub fn identity(&self) -> &str {
        match self {
            Speaker::Local { identity } => identity,
            Speaker::Remote(participant) => &participant.identity,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Speaker::Local { .. })
    }
}

/// Which input stream an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Chat,
    Transcription,
}

/// One line of the merged conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Chat message id or transcription stream id
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub text: String,
    /// `None` when the identity matched no known participant
    pub speaker: Option<Speaker>,
    pub source: EntrySource,
}

/// Raw input accepted by the merge engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptInput {
    Chat(ChatMessageEvent),
    Transcription(TranscriptionStreamEvent),
}

pub(crate) struct InputParts {
    pub id: String,
    pub timestamp: i64,
    pub text: String,
    pub participant_identity: String,
    pub source: EntrySource,
}

impl TranscriptInput {
    pub(crate) fn into_parts(self) -> InputParts {
        match self {
            TranscriptInput::Chat(message) => InputParts {
                id: message.id,
                timestamp: message.timestamp,
                text: message.text,
                participant_identity: message.participant_identity,
                source: EntrySource::Chat,
            },
            TranscriptInput::Transcription(stream) => InputParts {
                id: stream.stream_id,
                timestamp: stream.timestamp,
                text: stream.text,
                participant_identity: stream.participant_identity,
                source: EntrySource::Transcription,
            },
        }
    }
}

impl From<ChatMessageEvent> for TranscriptInput {
    fn from(message: ChatMessageEvent) -> Self {
        TranscriptInput::Chat(message)
    }
}

impl From<TranscriptionStreamEvent> for TranscriptInput {
    fn from(stream: TranscriptionStreamEvent) -> Self {
        TranscriptInput::Transcription(stream)
    }
}
