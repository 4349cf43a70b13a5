// Shared test doubles for the session controller
//
// The scripted transport records every call and lets a test decide how
// connect and microphone enable resolve. Events are pushed by the test
// through the returned sender.

#![allow(dead_code)]

use agent_embed::credentials::{ConnectionDetails, CredentialSource};
use agent_embed::error::{CredentialFetchError, TransportError};
use agent_embed::notify::{Alert, AlertSink};
use agent_embed::session::{SessionConfig, SessionController, SessionHandle, SessionState};
use agent_embed::transport::{ChatMessageEvent, LocalParticipant, Transport, TransportEvent};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub const LOCAL_IDENTITY: &str = "user-1";
pub const AGENT_IDENTITY: &str = "agent-1";

pub struct ScriptedTransport {
    pub connect_delay: Duration,
    pub audio_delay: Duration,
    connect_result: Mutex<Result<(), TransportError>>,
    audio_result: Mutex<Result<(), TransportError>>,
    pub connect_calls: Mutex<Vec<(String, String)>>,
    pub audio_calls: Mutex<Vec<bool>>,
    pub disconnect_calls: AtomicUsize,
    pub chat_counter: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            connect_delay: Duration::from_millis(100),
            audio_delay: Duration::from_millis(50),
            connect_result: Mutex::new(Ok(())),
            audio_result: Mutex::new(Ok(())),
            connect_calls: Mutex::new(Vec::new()),
            audio_calls: Mutex::new(Vec::new()),
            disconnect_calls: AtomicUsize::new(0),
            chat_counter: AtomicUsize::new(0),
        }
    }

    pub fn failing_connect(self, error: TransportError) -> Self {
        *self.connect_result.lock().unwrap() = Err(error);
        self
    }

    pub fn failing_audio(self, error: TransportError) -> Self {
        *self.audio_result.lock().unwrap() = Err(error);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connect_calls.lock().unwrap().len()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(
        &self,
        server_url: &str,
        token: &str,
    ) -> Result<LocalParticipant, TransportError> {
        self.connect_calls
            .lock()
            .unwrap()
            .push((server_url.to_string(), token.to_string()));
        tokio::time::sleep(self.connect_delay).await;

        self.connect_result.lock().unwrap().clone()?;
        Ok(LocalParticipant {
            identity: LOCAL_IDENTITY.to_string(),
            name: None,
        })
    }

    async fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn enable_local_audio(&self, pre_connect_buffer: bool) -> Result<(), TransportError> {
        self.audio_calls.lock().unwrap().push(pre_connect_buffer);
        tokio::time::sleep(self.audio_delay).await;
        self.audio_result.lock().unwrap().clone()
    }

    async fn send_chat_message(&self, text: &str) -> Result<ChatMessageEvent, TransportError> {
        let n = self.chat_counter.fetch_add(1, Ordering::SeqCst);
        Ok(ChatMessageEvent {
            id: format!("local-{}", n),
            timestamp: Utc::now().timestamp_millis(),
            text: text.to_string(),
            participant_identity: LOCAL_IDENTITY.to_string(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub struct StaticCredentials {
    pub delay: Duration,
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
    cache: Mutex<Option<ConnectionDetails>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(50),
            fail_with: None,
            calls: AtomicUsize::new(0),
            cache: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn acquire(&self) -> Result<ConnectionDetails, CredentialFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if let Some(message) = &self.fail_with {
            return Err(CredentialFetchError::Malformed(message.clone()));
        }

        let details = ConnectionDetails {
            server_url: "wss://x".to_string(),
            participant_token: "t1".to_string(),
            expires_at: Utc::now() + chrono::Duration::minutes(10),
            room_name: None,
            participant_name: None,
        };
        *self.cache.lock().unwrap() = Some(details.clone());
        Ok(details)
    }

    fn latest(&self) -> Option<ConnectionDetails> {
        self.cache.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    pub alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerts {
    pub fn titles(&self) -> Vec<String> {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.title.clone())
            .collect()
    }

    pub fn last(&self) -> Option<Alert> {
        self.alerts.lock().unwrap().last().cloned()
    }
}

impl AlertSink for RecordingAlerts {
    fn notify(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }
}

pub struct Harness {
    pub handle: SessionHandle,
    pub transport: Arc<ScriptedTransport>,
    pub credentials: Arc<StaticCredentials>,
    pub alerts: Arc<RecordingAlerts>,
    pub events: mpsc::Sender<TransportEvent>,
    pub states: broadcast::Receiver<SessionState>,
}

pub fn harness(transport: ScriptedTransport, credentials: StaticCredentials) -> Harness {
    harness_with_config(transport, credentials, SessionConfig::default())
}

pub fn harness_with_config(
    transport: ScriptedTransport,
    credentials: StaticCredentials,
    config: SessionConfig,
) -> Harness {
    let transport = Arc::new(transport);
    let credentials = Arc::new(credentials);
    let alerts = Arc::new(RecordingAlerts::default());
    let (events, events_rx) = mpsc::channel(64);

    let (handle, _task) = SessionController::spawn(
        config,
        credentials.clone(),
        transport.clone(),
        events_rx,
        alerts.clone(),
    );
    let states = handle.subscribe();

    Harness {
        handle,
        transport,
        credentials,
        alerts,
        events,
        states,
    }
}

impl Harness {
    /// Next state the controller enters
    pub async fn next_state(&mut self) -> SessionState {
        tokio::time::timeout(Duration::from_secs(60), self.states.recv())
            .await
            .expect("timed out waiting for a state change")
            .expect("state channel closed")
    }

    /// States entered until (and including) the next `Idle`
    pub async fn states_until_idle(&mut self) -> Vec<SessionState> {
        let mut seen = Vec::new();
        loop {
            let state = self.next_state().await;
            let idle = state.is_idle();
            seen.push(state);
            if idle {
                return seen;
            }
        }
    }

    pub async fn send(&self, event: TransportEvent) {
        self.events.send(event).await.expect("controller dropped events");
    }

    /// Start a session and drive it to `Active`
    pub async fn activate(&mut self) {
        self.handle.start();
        assert_eq!(self.next_state().await, SessionState::AcquiringCredentials);
        assert_eq!(self.next_state().await, SessionState::Connecting);
        assert_eq!(self.next_state().await, SessionState::AwaitingAgent);
        self.send(TransportEvent::AgentPresenceChanged(
            agent_embed::AgentPresence::Listening,
        ))
        .await;
        assert_eq!(self.next_state().await, SessionState::Active);
    }
}

/// Let the controller drain everything queued so far
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
