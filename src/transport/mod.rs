//! Real-time transport contract
//!
//! The room connection itself (signaling, media negotiation, codecs) lives
//! outside this crate. This module defines what the session controller needs
//! from it:
//! - `Transport`: connect / disconnect / enable microphone / send chat
//! - `TransportEvent`: lifecycle, presence and data events it emits
//! - `SimulatedRoom`: an in-process implementation for development

mod events;
mod handle;
mod simulated;

pub use events::{
    AgentPresence, ChatMessageEvent, LocalParticipant, RemoteParticipant,
    TranscriptionStreamEvent, TransportEvent,
};
pub use handle::Transport;
pub use simulated::{SimulatedRoom, SimulatedRoomConfig};
