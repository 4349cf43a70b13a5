use thiserror::Error;

/// Failure to obtain connection details from the token endpoint.
#[derive(Error, Debug)]
pub enum CredentialFetchError {
    #[error("connection details request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("connection details endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed connection details: {0}")]
    Malformed(String),
}

/// Errors reported by the real-time transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("{0}")]
    Connect(String),

    /// Microphone or other local media device could not be acquired.
    #[error("{name}: {message}")]
    Device { name: String, message: String },

    #[error("transport is not connected")]
    NotConnected,

    #[error("failed to send message: {0}")]
    Send(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no session is connected")]
    NotActive,

    #[error("session controller has shut down")]
    ControllerClosed,

    #[error(transparent)]
    Transport(#[from] TransportError),
}
