use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::deadline::Deadline;
use super::machine::{Attempt, Effect, SessionEvent, SessionMachine};
use super::state::SessionState;
use crate::credentials::CredentialSource;
use crate::error::SessionError;
use crate::notify::AlertSink;
use crate::transcript::{TranscriptEngine, TranscriptEntry, TranscriptInput};
use crate::transport::{AgentPresence, ChatMessageEvent, Transport, TransportEvent};

/// Capacity of the state history broadcast channel
const STATE_HISTORY_CAPACITY: usize = 64;

enum Command {
    Start,
    Stop,
    SendChat {
        text: String,
        reply: oneshot::Sender<Result<TranscriptEntry, SessionError>>,
    },
}

/// Completions posted back by tasks the controller spawned
enum Internal {
    Session(SessionEvent),
    ChatSent {
        attempt: Attempt,
        message: ChatMessageEvent,
        reply: oneshot::Sender<Result<TranscriptEntry, SessionError>>,
    },
}

/// Drives one widget's session.
///
/// Runs as a single task that owns the state machine, the transcript and the
/// liveness deadline. Inputs are processed one at a time from three queues:
/// completions of its own async work, transport events, and commands from
/// `SessionHandle`s.
pub struct SessionController {
    config: SessionConfig,
    machine: SessionMachine,
    transcript: TranscriptEngine,
    liveness: Deadline,

    credentials: Arc<dyn CredentialSource>,
    transport: Arc<dyn Transport>,
    alerts: Arc<dyn AlertSink>,

    commands: mpsc::UnboundedReceiver<Command>,
    transport_events: mpsc::Receiver<TransportEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    pending: VecDeque<SessionEvent>,

    state_tx: watch::Sender<SessionState>,
    history_tx: broadcast::Sender<SessionState>,
    presence_tx: watch::Sender<AgentPresence>,
    transcript_tx: watch::Sender<Arc<[TranscriptEntry]>>,
}

impl SessionController {
    /// Spawn the controller task and return a handle to it
    pub fn spawn(
        config: SessionConfig,
        credentials: Arc<dyn CredentialSource>,
        transport: Arc<dyn Transport>,
        transport_events: mpsc::Receiver<TransportEvent>,
        alerts: Arc<dyn AlertSink>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let (history_tx, _) = broadcast::channel(STATE_HISTORY_CAPACITY);
        let (presence_tx, presence_rx) = watch::channel(AgentPresence::Disconnected);
        let empty: Arc<[TranscriptEntry]> = Arc::from(Vec::new());
        let (transcript_tx, transcript_rx) = watch::channel(empty);

        let handle = SessionHandle {
            commands: commands_tx,
            state: state_rx,
            presence: presence_rx,
            transcript: transcript_rx,
            history: history_tx.clone(),
        };

        info!(
            "Session controller starting (transport: {}, liveness timeout: {:?})",
            transport.name(),
            config.liveness_timeout
        );

        let controller = Self {
            config,
            machine: SessionMachine::new(),
            transcript: TranscriptEngine::new(),
            liveness: Deadline::new(),
            credentials,
            transport,
            alerts,
            commands,
            transport_events,
            internal_tx,
            internal_rx,
            pending: VecDeque::new(),
            state_tx,
            history_tx,
            presence_tx,
            transcript_tx,
        };

        let task = tokio::spawn(controller.run());
        (handle, task)
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                Some(internal) = self.internal_rx.recv() => {
                    self.on_internal(internal).await;
                }
                Some(event) = self.transport_events.recv() => {
                    self.on_transport_event(event).await;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
            }
        }

        info!("All session handles dropped, shutting down controller");
        self.liveness.cancel();
        self.transport.disconnect().await;
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Start => self.dispatch(SessionEvent::StartRequested).await,
            Command::Stop => self.dispatch(SessionEvent::StopRequested).await,
            Command::SendChat { text, reply } => self.send_chat(text, reply),
        }
    }

    async fn on_internal(&mut self, internal: Internal) {
        match internal {
            Internal::Session(event) => self.dispatch(event).await,
            Internal::ChatSent {
                attempt,
                message,
                reply,
            } => {
                let id = message.id.clone();
                if attempt == self.machine.attempt() && self.machine.state().is_connected() {
                    self.ingest(message.into());
                }
                let result = match self.transcript.get(&id) {
                    Some(entry) => Ok(entry.clone()),
                    None => Err(SessionError::NotActive),
                };
                let _ = reply.send(result);
            }
        }
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Disconnected => {
                self.dispatch(SessionEvent::TransportDisconnected).await
            }
            TransportEvent::MediaDevicesError { name, message } => {
                warn!("Media device error: {}: {}", name, message);
                self.dispatch(SessionEvent::DeviceError { name, message })
                    .await
            }
            TransportEvent::AgentPresenceChanged(presence) => {
                self.dispatch(SessionEvent::AgentPresenceChanged(presence))
                    .await
            }
            TransportEvent::ParticipantConnected(participant) => {
                debug!("Participant connected: {}", participant.identity);
                self.transcript.participant_connected(participant);
            }
            TransportEvent::ParticipantDisconnected { identity } => {
                debug!("Participant disconnected: {}", identity);
                self.transcript.participant_disconnected(&identity);
            }
            TransportEvent::ChatMessage(message) => self.ingest(message.into()),
            TransportEvent::Transcription(stream) => self.ingest(stream.into()),
        }
    }

    /// Run an event and everything it triggers to completion
    async fn dispatch(&mut self, event: SessionEvent) {
        self.pending.push_back(event);

        while let Some(event) = self.pending.pop_front() {
            let before = self.machine.state().clone();
            let presence_before = self.machine.presence();

            let effects = self.machine.apply(event);

            if self.machine.presence() != presence_before {
                self.presence_tx.send_replace(self.machine.presence());
            }
            if *self.machine.state() != before {
                self.publish_state();
            }

            for effect in effects {
                self.execute(effect).await;
            }
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::AcquireCredentials { attempt } => {
                // No room is joined for this attempt yet; anything known
                // about participants is left over from an earlier one
                self.transcript.clear();

                let credentials = Arc::clone(&self.credentials);
                let tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    let event = match credentials.acquire().await {
                        Ok(details) => SessionEvent::CredentialsAcquired { attempt, details },
                        Err(e) => SessionEvent::CredentialsFailed {
                            attempt,
                            error: e.to_string(),
                        },
                    };
                    let _ = tx.send(Internal::Session(event));
                });
            }

            Effect::Connect { attempt, details } => {
                let transport = Arc::clone(&self.transport);
                let pre_connect_buffer = self.config.is_pre_connect_buffer_enabled;
                let tx = self.internal_tx.clone();

                info!(
                    "Connecting to {} (attempt {}, pre-connect buffer: {})",
                    details.server_url, attempt, pre_connect_buffer
                );

                tokio::spawn(async move {
                    let room = transport.connect(&details.server_url, &details.participant_token);
                    let microphone = transport.enable_local_audio(pre_connect_buffer);

                    let result = futures::future::try_join(room, microphone)
                        .await
                        .map(|(local, ())| local);

                    if let Err(e) = &result {
                        error!("Error connecting to agent: {}", e);
                    }
                    let _ = tx.send(Internal::Session(SessionEvent::ConnectFinished {
                        attempt,
                        result,
                    }));
                });
            }

            Effect::ArmLiveness { attempt } => {
                self.liveness.arm(
                    self.config.liveness_timeout,
                    Internal::Session(SessionEvent::LivenessExpired { attempt }),
                    self.internal_tx.clone(),
                );
            }

            Effect::CancelLiveness => {
                if self.liveness.cancel() {
                    debug!("Liveness deadline cancelled");
                }
            }

            Effect::Notify(alert) => self.alerts.notify(alert),

            Effect::BeginSession { local } => {
                info!("Joined room as {}", local.identity);
                self.transcript.clear_entries();
                self.transcript.set_local_identity(Some(local.identity));
                self.publish_transcript();
            }

            Effect::Teardown {
                refresh_credentials,
            } => {
                self.liveness.cancel();
                self.transport.disconnect().await;
                self.discard_queued_transport_events();

                self.transcript.clear();
                self.publish_transcript();

                if refresh_credentials {
                    let credentials = Arc::clone(&self.credentials);
                    tokio::spawn(async move {
                        if let Err(e) = credentials.refresh().await {
                            warn!("Failed to refresh connection details: {}", e);
                        }
                    });
                }

                self.pending.push_back(SessionEvent::TeardownFinished);
            }

            Effect::Disconnect => {
                self.transport.disconnect().await;
                self.discard_queued_transport_events();
            }

            Effect::Dispatch(event) => self.pending.push_back(event),
        }
    }

    /// Events already queued by a connection that was just closed
    fn discard_queued_transport_events(&mut self) {
        let mut discarded = 0;
        while self.transport_events.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!("Discarded {} events from the closed connection", discarded);
        }
    }

    fn send_chat(
        &mut self,
        text: String,
        reply: oneshot::Sender<Result<TranscriptEntry, SessionError>>,
    ) {
        if !self.machine.state().is_connected() {
            let _ = reply.send(Err(SessionError::NotActive));
            return;
        }

        let transport = Arc::clone(&self.transport);
        let attempt = self.machine.attempt();
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            match transport.send_chat_message(&text).await {
                Ok(message) => {
                    let _ = tx.send(Internal::ChatSent {
                        attempt,
                        message,
                        reply,
                    });
                }
                Err(e) => {
                    warn!("Failed to send chat message: {}", e);
                    let _ = reply.send(Err(e.into()));
                }
            }
        });
    }

    fn ingest(&mut self, input: TranscriptInput) {
        let state = self.machine.state();
        if !state.is_connected() {
            debug!("Dropping transcript input while {}", state);
            return;
        }

        self.transcript.ingest(input);
        self.publish_transcript();
    }

    fn publish_state(&self) {
        let state = self.machine.state().clone();
        info!("Session state: {}", state);
        let _ = self.history_tx.send(state.clone());
        self.state_tx.send_replace(state);
    }

    fn publish_transcript(&self) {
        let snapshot: Arc<[TranscriptEntry]> = self.transcript.current_entries().into();
        self.transcript_tx.send_replace(snapshot);
    }
}

/// Cloneable front end of a running `SessionController`.
///
/// Start and stop are fire-and-forget; their outcome is observed through
/// the state accessors and `subscribe`.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    presence: watch::Receiver<AgentPresence>,
    transcript: watch::Receiver<Arc<[TranscriptEntry]>>,
    history: broadcast::Sender<SessionState>,
}

impl SessionHandle {
    pub fn start(&self) {
        if self.commands.send(Command::Start).is_err() {
            warn!("Session controller is not running; start ignored");
        }
    }

    /// Leave the session. Safe to call in any state.
    pub fn disconnect(&self) {
        if self.commands.send(Command::Stop).is_err() {
            warn!("Session controller is not running; disconnect ignored");
        }
    }

    /// Send a chat message and return its transcript entry
    pub async fn send_chat_message(
        &self,
        text: impl Into<String>,
    ) -> Result<TranscriptEntry, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::SendChat {
                text: text.into(),
                reply,
            })
            .map_err(|_| SessionError::ControllerClosed)?;

        rx.await.map_err(|_| SessionError::ControllerClosed)?
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn agent_presence(&self) -> AgentPresence {
        *self.presence.borrow()
    }

    /// Snapshot of the ordered transcript
    pub fn current_entries(&self) -> Arc<[TranscriptEntry]> {
        Arc::clone(&self.transcript.borrow())
    }

    /// Every state the controller enters from now on, in order
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.history.subscribe()
    }

    /// Receiver that always holds the latest state
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Receiver that always holds the latest transcript snapshot
    pub fn watch_transcript(&self) -> watch::Receiver<Arc<[TranscriptEntry]>> {
        self.transcript.clone()
    }
}
