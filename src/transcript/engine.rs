// Transcript merge engine
//
// Chat messages and transcription fragments arrive on independent streams.
// The engine folds both into a single sequence ordered by
// (timestamp, arrival), keyed by message/stream id so that repeated ids
// update an entry instead of appending a new one.
//
// Two indexes are kept in step on every ingest:
// - `index`: id -> sort key
// - `entries`: sort key -> entry (the ordered view)

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::entry::{InputParts, Speaker, TranscriptEntry, TranscriptInput};
use crate::transport::RemoteParticipant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    timestamp: i64,
    /// Arrival counter, breaks timestamp ties
    seq: u64,
}

/// What an ingest did to the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    /// Text replaced in place
    Updated,
    /// Text replaced and the entry re-sorted under a newer timestamp
    Moved,
}

#[derive(Debug, Default)]
pub struct TranscriptEngine {
    local_identity: Option<String>,
    participants: HashMap<String, RemoteParticipant>,
    index: HashMap<String, SortKey>,
    entries: BTreeMap<SortKey, TranscriptEntry>,
    next_seq: u64,
}

impl TranscriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_local_identity(&mut self, identity: Option<String>) {
        self.local_identity = identity;
    }

    pub fn participant_connected(&mut self, participant: RemoteParticipant) {
        self.participants
            .insert(participant.identity.clone(), participant);
    }

    pub fn participant_disconnected(&mut self, identity: &str) {
        self.participants.remove(identity);
    }

    pub fn ingest(&mut self, input: impl Into<TranscriptInput>) -> IngestOutcome {
        let InputParts {
            id,
            timestamp,
            text,
            participant_identity,
            source,
        } = input.into().into_parts();

        let speaker = self.resolve(&participant_identity);

        let Some(key) = self.index.get(&id).copied() else {
            let key = self.next_key(timestamp);
            self.index.insert(id.clone(), key);
            self.entries.insert(
                key,
                TranscriptEntry {
                    id,
                    timestamp,
                    text,
                    speaker,
                    source,
                },
            );
            return IngestOutcome::Inserted;
        };

        if timestamp > key.timestamp {
            let previous = self.entries.remove(&key);
            let new_key = self.next_key(timestamp);
            let speaker = speaker.or_else(|| previous.and_then(|entry| entry.speaker));

            debug!("Re-sorting transcript entry {} to {}", id, timestamp);
            self.index.insert(id.clone(), new_key);
            self.entries.insert(
                new_key,
                TranscriptEntry {
                    id,
                    timestamp,
                    text,
                    speaker,
                    source,
                },
            );
            return IngestOutcome::Moved;
        }

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.text = text;
            if speaker.is_some() {
                entry.speaker = speaker;
            }
        }
        IngestOutcome::Updated
    }

    /// Ordered view of the conversation
    pub fn iter(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.values()
    }

    pub fn current_entries(&self) -> Vec<TranscriptEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&TranscriptEntry> {
        self.index.get(id).and_then(|key| self.entries.get(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries but keep the participant roster
    pub fn clear_entries(&mut self) {
        self.index.clear();
        self.entries.clear();
        self.next_seq = 0;
    }

    /// Drop all entries, the participant roster and the local identity
    pub fn clear(&mut self) {
        self.clear_entries();
        self.local_identity = None;
        self.participants.clear();
    }

    fn next_key(&mut self, timestamp: i64) -> SortKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        SortKey { timestamp, seq }
    }

    fn resolve(&self, identity: &str) -> Option<Speaker> {
        if self.local_identity.as_deref() == Some(identity) {
            return Some(Speaker::Local {
                identity: identity.to_string(),
            });
        }

        self.participants
            .get(identity)
            .cloned()
            .map(Speaker::Remote)
    }
}
