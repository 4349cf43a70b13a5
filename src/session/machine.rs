// Session state machine
//
// `transition` is the only place that decides what happens next: given the
// current state, the bookkeeping context and an event, it returns the next
// state plus the effects the controller must carry out. It performs no I/O.
//
// Every asynchronous operation is tagged with the attempt it was issued
// under. A result whose attempt or expected state no longer matches is
// stale and is dropped (a connect that completes after the attempt was
// abandoned is answered with a disconnect).

use tracing::debug;

use super::state::{FailureReason, SessionState};
use crate::credentials::ConnectionDetails;
use crate::error::TransportError;
use crate::notify::Alert;
use crate::transport::{AgentPresence, LocalParticipant};

const ROOM_CLOSED_WHILE_CONNECTING: &str = "room disconnected before the session started";

/// Counter identifying one start-to-teardown attempt
pub type Attempt = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StartRequested,
    StopRequested,
    CredentialsAcquired {
        attempt: Attempt,
        details: ConnectionDetails,
    },
    CredentialsFailed {
        attempt: Attempt,
        error: String,
    },
    /// Joint outcome of room connect and microphone enable
    ConnectFinished {
        attempt: Attempt,
        result: Result<LocalParticipant, TransportError>,
    },
    AgentPresenceChanged(AgentPresence),
    LivenessExpired {
        attempt: Attempt,
    },
    TransportDisconnected,
    DeviceError {
        name: String,
        message: String,
    },
    TeardownFinished,
}

/// Work the controller performs on behalf of a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AcquireCredentials { attempt: Attempt },
    /// Connect the room and enable the microphone concurrently
    Connect {
        attempt: Attempt,
        details: ConnectionDetails,
    },
    ArmLiveness { attempt: Attempt },
    CancelLiveness,
    Notify(Alert),
    /// Fresh transcript bound to the local participant
    BeginSession { local: LocalParticipant },
    /// Disconnect, discard session state, then feed back `TeardownFinished`
    Teardown { refresh_credentials: bool },
    Disconnect,
    Dispatch(SessionEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineContext {
    pub attempt: Attempt,
    /// Last presence reported by the transport
    pub presence: AgentPresence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: SessionState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }

    fn stay(state: &SessionState) -> Self {
        Self::to(state.clone(), Vec::new())
    }

    fn fail(reason: FailureReason, refresh_credentials: bool) -> Self {
        let alert = reason.alert();
        Self::to(
            SessionState::Failed(reason),
            vec![Effect::Notify(alert), Effect::Teardown { refresh_credentials }],
        )
    }
}

pub fn transition(state: &SessionState, ctx: &MachineContext, event: &SessionEvent) -> Transition {
    use SessionState::*;

    match (state, event) {
        (Idle, SessionEvent::StartRequested) => Transition::to(
            AcquiringCredentials,
            vec![Effect::AcquireCredentials {
                attempt: ctx.attempt,
            }],
        ),
        (_, SessionEvent::StartRequested) => Transition::stay(state),

        (Idle, SessionEvent::StopRequested) => Transition::to(Idle, vec![Effect::Disconnect]),
        (AcquiringCredentials, SessionEvent::StopRequested) => Transition::to(Idle, Vec::new()),
        // The token may already be spent by the in-flight connect
        (Connecting, SessionEvent::StopRequested) => Transition::to(
            Idle,
            vec![Effect::Teardown {
                refresh_credentials: true,
            }],
        ),
        (Connecting, SessionEvent::TransportDisconnected) => Transition::fail(
            FailureReason::Transport(ROOM_CLOSED_WHILE_CONNECTING.to_string()),
            true,
        ),
        (AwaitingAgent, SessionEvent::StopRequested | SessionEvent::TransportDisconnected) => {
            Transition::to(
                Disconnecting,
                vec![
                    Effect::CancelLiveness,
                    Effect::Teardown {
                        refresh_credentials: true,
                    },
                ],
            )
        }
        (Active, SessionEvent::StopRequested | SessionEvent::TransportDisconnected) => {
            Transition::to(
                Disconnecting,
                vec![Effect::Teardown {
                    refresh_credentials: true,
                }],
            )
        }
        (_, SessionEvent::StopRequested | SessionEvent::TransportDisconnected) => {
            Transition::stay(state)
        }

        (AcquiringCredentials, SessionEvent::CredentialsAcquired { attempt, details })
            if *attempt == ctx.attempt =>
        {
            Transition::to(
                Connecting,
                vec![Effect::Connect {
                    attempt: *attempt,
                    details: details.clone(),
                }],
            )
        }
        (AcquiringCredentials, SessionEvent::CredentialsFailed { attempt, error })
            if *attempt == ctx.attempt =>
        {
            Transition::fail(FailureReason::Credential(error.clone()), false)
        }
        (_, SessionEvent::CredentialsAcquired { .. } | SessionEvent::CredentialsFailed { .. }) => {
            Transition::stay(state)
        }

        (Connecting, SessionEvent::ConnectFinished { attempt, result })
            if *attempt == ctx.attempt =>
        {
            match result {
                Ok(local) => {
                    let mut effects = vec![
                        Effect::BeginSession {
                            local: local.clone(),
                        },
                        Effect::ArmLiveness { attempt: *attempt },
                    ];
                    if ctx.presence.is_ready() {
                        effects.push(Effect::Dispatch(SessionEvent::AgentPresenceChanged(
                            ctx.presence,
                        )));
                    }
                    Transition::to(AwaitingAgent, effects)
                }
                Err(error) => Transition::fail(FailureReason::from(error), true),
            }
        }
        // A connect from an abandoned attempt may have joined the room after
        // all; leave again unless a newer attempt is already using the room.
        (Idle | AcquiringCredentials, SessionEvent::ConnectFinished { result: Ok(_), .. }) => {
            Transition::to(state.clone(), vec![Effect::Disconnect])
        }
        (_, SessionEvent::ConnectFinished { .. }) => Transition::stay(state),

        (AwaitingAgent, SessionEvent::AgentPresenceChanged(presence)) if presence.is_ready() => {
            Transition::to(Active, vec![Effect::CancelLiveness])
        }
        (_, SessionEvent::AgentPresenceChanged(_)) => Transition::stay(state),

        (AwaitingAgent, SessionEvent::LivenessExpired { attempt }) if *attempt == ctx.attempt => {
            let reason = if ctx.presence == AgentPresence::Connecting {
                FailureReason::AgentAbsent
            } else {
                FailureReason::AgentIncomplete
            };
            Transition::fail(reason, true)
        }
        (_, SessionEvent::LivenessExpired { .. }) => Transition::stay(state),

        (Connecting, SessionEvent::DeviceError { name, message }) => Transition::fail(
            FailureReason::Device(format!("{}: {}", name, message)),
            true,
        ),
        (_, SessionEvent::DeviceError { name, message }) => Transition::to(
            state.clone(),
            vec![Effect::Notify(
                FailureReason::Device(format!("{}: {}", name, message)).alert(),
            )],
        ),

        (Disconnecting | Failed(_), SessionEvent::TeardownFinished) => {
            Transition::to(Idle, Vec::new())
        }
        (_, SessionEvent::TeardownFinished) => Transition::stay(state),
    }
}

/// Owns the current state and the bookkeeping `transition` reads
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
    ctx: MachineContext,
}

impl Default for MachineContext {
    fn default() -> Self {
        Self {
            attempt: 0,
            presence: AgentPresence::Disconnected,
        }
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn attempt(&self) -> Attempt {
        self.ctx.attempt
    }

    pub fn presence(&self) -> AgentPresence {
        self.ctx.presence
    }

    /// Feed one event through `transition`, commit the result and return
    /// the effects to execute
    pub fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        match &event {
            SessionEvent::StartRequested if self.state.is_idle() => {
                self.ctx.attempt += 1;
                self.ctx.presence = AgentPresence::Disconnected;
            }
            SessionEvent::AgentPresenceChanged(presence) => {
                self.ctx.presence = *presence;
            }
            _ => {}
        }

        let Transition { next, effects } = transition(&self.state, &self.ctx, &event);

        // Once the room is joined an unreported agent counts as still connecting
        if next == SessionState::AwaitingAgent
            && self.state != SessionState::AwaitingAgent
            && self.ctx.presence == AgentPresence::Disconnected
        {
            self.ctx.presence = AgentPresence::Connecting;
        }

        if next != self.state {
            debug!(
                "Session {} -> {} (attempt {})",
                self.state, next, self.ctx.attempt
            );
        }
        self.state = next;
        effects
    }
}
