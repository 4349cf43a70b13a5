pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod notify;
pub mod session;
pub mod transcript;
pub mod transport;

pub use config::Config;
pub use credentials::{ConnectionDetails, CredentialSource, HttpCredentialSource};
pub use error::{CredentialFetchError, SessionError, TransportError};
pub use http::{create_router, AppState};
pub use notify::{Alert, AlertLog, AlertSink, TracingAlertSink};
pub use session::{FailureReason, SessionConfig, SessionController, SessionHandle, SessionState};
pub use transcript::{Speaker, TranscriptEngine, TranscriptEntry};
pub use transport::{
    AgentPresence, ChatMessageEvent, SimulatedRoom, SimulatedRoomConfig,
    TranscriptionStreamEvent, Transport, TransportEvent,
};
