// In-process room for development and demos
//
// Connecting succeeds after a short delay. A scripted agent then walks
// through the presence phases a real agent reports while joining, and
// answers every chat message with a transcription streamed in fragments.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::events::{
    AgentPresence, ChatMessageEvent, LocalParticipant, RemoteParticipant,
    TranscriptionStreamEvent, TransportEvent,
};
use super::handle::Transport;
use crate::error::TransportError;

/// Capacity of the event channel handed to the controller
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Timing and identities for the simulated room
#[derive(Debug, Clone)]
pub struct SimulatedRoomConfig {
    pub local_identity: String,
    pub agent_identity: String,
    pub connect_delay: Duration,
    /// Delay between the room connecting and the agent joining
    pub agent_join_delay: Duration,
    /// Delay between the agent joining and it reporting `listening`
    pub agent_ready_delay: Duration,
    /// Delay between reply fragments
    pub fragment_delay: Duration,
}

impl Default for SimulatedRoomConfig {
    fn default() -> Self {
        Self {
            local_identity: format!("user-{}", uuid::Uuid::new_v4()),
            agent_identity: "agent".to_string(),
            connect_delay: Duration::from_millis(200),
            agent_join_delay: Duration::from_millis(500),
            agent_ready_delay: Duration::from_millis(500),
            fragment_delay: Duration::from_millis(150),
        }
    }
}

#[derive(Debug, Default)]
struct RoomState {
    connected: bool,
    audio_enabled: bool,
    /// Bumped on every connect/disconnect so stale agent scripts stop
    generation: u64,
}

pub struct SimulatedRoom {
    config: SimulatedRoomConfig,
    state: Arc<Mutex<RoomState>>,
    events: mpsc::Sender<TransportEvent>,
}

impl SimulatedRoom {
    pub fn new(config: SimulatedRoomConfig) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let room = Self {
            config,
            state: Arc::new(Mutex::new(RoomState::default())),
            events,
        };
        (room, rx)
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().map(|s| s.connected).unwrap_or(false)
    }

    pub fn is_audio_enabled(&self) -> bool {
        self.state.lock().map(|s| s.audio_enabled).unwrap_or(false)
    }

    fn current_generation(&self) -> Option<u64> {
        let state = self.state.lock().ok()?;
        state.connected.then_some(state.generation)
    }

    fn spawn_agent_join(&self, generation: u64) {
        let script = AgentScript::new(self, generation);
        let join_delay = self.config.agent_join_delay;
        let ready_delay = self.config.agent_ready_delay;
        let agent = RemoteParticipant {
            identity: self.config.agent_identity.clone(),
            name: Some("Agent".to_string()),
        };

        tokio::spawn(async move {
            script.emit(TransportEvent::AgentPresenceChanged(AgentPresence::Connecting)).await;

            tokio::time::sleep(join_delay).await;
            script.emit(TransportEvent::ParticipantConnected(agent)).await;
            script.emit(TransportEvent::AgentPresenceChanged(AgentPresence::Initializing)).await;

            tokio::time::sleep(ready_delay).await;
            script.emit(TransportEvent::AgentPresenceChanged(AgentPresence::Listening)).await;
        });
    }

    fn spawn_agent_reply(&self, generation: u64, heard: String) {
        let script = AgentScript::new(self, generation);
        let delay = self.config.fragment_delay;
        let agent_identity = self.config.agent_identity.clone();

        tokio::spawn(async move {
            script.emit(TransportEvent::AgentPresenceChanged(AgentPresence::Thinking)).await;
            tokio::time::sleep(delay).await;
            script.emit(TransportEvent::AgentPresenceChanged(AgentPresence::Speaking)).await;

            let stream_id = format!("TR_{}", uuid::Uuid::new_v4().simple());
            let timestamp = Utc::now().timestamp_millis();
            let reply = format!("You said: {}", heard);

            let mut text = String::new();
            for word in reply.split_whitespace() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(word);

                script
                    .emit(TransportEvent::Transcription(TranscriptionStreamEvent {
                        stream_id: stream_id.clone(),
                        timestamp,
                        text: text.clone(),
                        participant_identity: agent_identity.clone(),
                    }))
                    .await;
                tokio::time::sleep(delay).await;
            }

            script.emit(TransportEvent::AgentPresenceChanged(AgentPresence::Listening)).await;
        });
    }
}

/// Emits events on behalf of the agent while its connection generation is live
struct AgentScript {
    state: Arc<Mutex<RoomState>>,
    events: mpsc::Sender<TransportEvent>,
    generation: u64,
}

impl AgentScript {
    fn new(room: &SimulatedRoom, generation: u64) -> Self {
        Self {
            state: Arc::clone(&room.state),
            events: room.events.clone(),
            generation,
        }
    }

    async fn emit(&self, event: TransportEvent) {
        let live = self
            .state
            .lock()
            .map(|s| s.connected && s.generation == self.generation)
            .unwrap_or(false);
        if !live {
            debug!("Dropping simulated event from closed connection: {:?}", event);
            return;
        }

        if self.events.send(event).await.is_err() {
            debug!("Simulated room event receiver closed");
        }
    }
}

#[async_trait]
impl Transport for SimulatedRoom {
    async fn connect(
        &self,
        server_url: &str,
        token: &str,
    ) -> Result<LocalParticipant, TransportError> {
        info!(
            "Simulated room connecting to '{}' with token length {}",
            server_url,
            token.len()
        );

        if token.is_empty() {
            return Err(TransportError::Connect("empty participant token".to_string()));
        }

        tokio::time::sleep(self.config.connect_delay).await;

        let generation = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| TransportError::Connect("room state poisoned".to_string()))?;
            state.connected = true;
            state.generation += 1;
            state.generation
        };

        self.spawn_agent_join(generation);

        Ok(LocalParticipant {
            identity: self.config.local_identity.clone(),
            name: None,
        })
    }

    async fn disconnect(&self) {
        let was_connected = match self.state.lock() {
            Ok(mut state) => {
                let was_connected = state.connected;
                state.connected = false;
                state.audio_enabled = false;
                state.generation += 1;
                was_connected
            }
            Err(_) => false,
        };

        if !was_connected {
            debug!("Simulated room already disconnected");
            return;
        }

        info!("Simulated room disconnected");
        for event in [
            TransportEvent::AgentPresenceChanged(AgentPresence::Disconnected),
            TransportEvent::Disconnected,
        ] {
            if self.events.send(event).await.is_err() {
                warn!("Simulated room event receiver closed");
            }
        }
    }

    async fn enable_local_audio(&self, pre_connect_buffer: bool) -> Result<(), TransportError> {
        info!(
            "Simulated room enabling microphone (pre-connect buffer: {})",
            pre_connect_buffer
        );

        let mut state = self.state.lock().map_err(|_| TransportError::Device {
            name: "NotReadableError".to_string(),
            message: "room state poisoned".to_string(),
        })?;
        state.audio_enabled = true;
        Ok(())
    }

    async fn send_chat_message(&self, text: &str) -> Result<ChatMessageEvent, TransportError> {
        let generation = self.current_generation().ok_or(TransportError::NotConnected)?;

        let message = ChatMessageEvent {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            text: text.to_string(),
            participant_identity: self.config.local_identity.clone(),
        };

        self.spawn_agent_reply(generation, text.to_string());
        Ok(message)
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
