//! Conversation transcript
//!
//! Merges chat messages and streamed speech-to-text into one ordered,
//! deduplicated sequence with speakers resolved against the room.

mod engine;
mod entry;

pub use engine::{IngestOutcome, TranscriptEngine};
pub use entry::{EntrySource, Speaker, TranscriptEntry, TranscriptInput};
