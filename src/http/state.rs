use crate::credentials::CredentialSource;
use crate::notify::AlertLog;
use crate::session::SessionHandle;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The widget's session controller
    pub session: SessionHandle,

    /// Credential source, read for cache status only
    pub credentials: Arc<dyn CredentialSource>,

    /// Recent alerts raised by the session
    pub alerts: Arc<AlertLog>,
}

impl AppState {
    pub fn new(
        session: SessionHandle,
        credentials: Arc<dyn CredentialSource>,
        alerts: Arc<AlertLog>,
    ) -> Self {
        Self {
            session,
            credentials,
            alerts,
        }
    }
}
