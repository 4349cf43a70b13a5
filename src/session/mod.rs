//! Session lifecycle
//!
//! This module provides the session controller that:
//! - Acquires connection details for each start
//! - Connects the room and enables the microphone as one joint step
//! - Fails the session if the agent is not ready within the liveness timeout
//! - Feeds room events into the transcript while connected
//! - Tears down and returns to idle on leave, disconnect or failure

mod config;
mod controller;
mod deadline;
mod machine;
mod state;
mod status;

pub use config::SessionConfig;
pub use controller::{SessionController, SessionHandle};
pub use deadline::Deadline;
pub use machine::{
    transition, Attempt, Effect, MachineContext, SessionEvent, SessionMachine, Transition,
};
pub use state::{FailureReason, SessionState};
pub use status::SessionStatus;
