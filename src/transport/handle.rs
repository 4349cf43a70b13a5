use async_trait::async_trait;

use super::events::{ChatMessageEvent, LocalParticipant};
use crate::error::TransportError;

/// Real-time room connection shared by one widget.
///
/// Only the session controller calls these operations. Lifecycle, presence
/// and data events are delivered separately on the
/// `mpsc::Receiver<TransportEvent>` paired with the implementation.
///
/// Implementations:
/// - `SimulatedRoom`: in-process room with a scripted agent (development)
/// - Production rooms wrap a WebRTC SDK behind the same contract
#[async_trait]
pub trait Transport: Send + Sync {
    /// Join the room at `server_url` using `token`
    async fn connect(
        &self,
        server_url: &str,
        token: &str,
    ) -> Result<LocalParticipant, TransportError>;

    /// Leave the room. Safe to call in any state, any number of times.
    async fn disconnect(&self);

    /// Start publishing the local microphone.
    ///
    /// With `pre_connect_buffer`, capture starts immediately and is buffered
    /// until the room connection is confirmed.
    async fn enable_local_audio(&self, pre_connect_buffer: bool) -> Result<(), TransportError>;

    /// Send a chat message; returns the message as it will appear locally
    async fn send_chat_message(&self, text: &str) -> Result<ChatMessageEvent, TransportError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
