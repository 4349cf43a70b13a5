use async_trait::async_trait;
use serde_json::json;
use std::sync::RwLock;
use tracing::{info, warn};

use super::details::{ConnectionDetails, ConnectionDetailsResponse};
use crate::config::{CredentialsConfig, WidgetConfig, DEFAULT_TOKEN_TTL_SECS};
use crate::error::CredentialFetchError;

/// Source of connection details for new sessions.
///
/// Implementations hold an in-memory copy of the latest value. No retry
/// policy lives here; a failed acquisition is reported to the caller.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch fresh connection details and cache them
    async fn acquire(&self) -> Result<ConnectionDetails, CredentialFetchError>;

    /// Re-run acquisition, replacing the cached value
    async fn refresh(&self) -> Result<ConnectionDetails, CredentialFetchError> {
        self.acquire().await
    }

    /// Most recently acquired details, without I/O
    fn latest(&self) -> Option<ConnectionDetails>;
}

/// Fetches connection details from `<origin><endpoint>`
pub struct HttpCredentialSource {
    client: reqwest::Client,
    url: String,
    sandbox_id: Option<String>,
    agent_name: Option<String>,
    fallback_ttl: chrono::Duration,
    cache: RwLock<Option<ConnectionDetails>>,
}

impl HttpCredentialSource {
    pub fn new(credentials: &CredentialsConfig, widget: &WidgetConfig) -> Self {
        let url = format!(
            "{}/{}",
            credentials.origin.trim_end_matches('/'),
            credentials.endpoint.trim_start_matches('/')
        );

        let fallback_ttl = credentials.token_ttl().unwrap_or_else(|| {
            warn!(
                "token_ttl_secs {} out of range, using {}",
                credentials.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS
            );
            chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECS as i64)
        });

        Self {
            client: reqwest::Client::new(),
            url,
            sandbox_id: credentials.sandbox_id.clone(),
            agent_name: widget.agent_name.clone(),
            fallback_ttl,
            cache: RwLock::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_body(&self) -> serde_json::Value {
        match &self.agent_name {
            Some(agent_name) => json!({
                "room_config": { "agents": [{ "agent_name": agent_name }] }
            }),
            None => json!({}),
        }
    }

    async fn fetch(&self) -> Result<ConnectionDetails, CredentialFetchError> {
        let mut request = self.client.post(&self.url).json(&self.request_body());
        if let Some(sandbox_id) = &self.sandbox_id {
            request = request.header("X-Sandbox-Id", sandbox_id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialFetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ConnectionDetailsResponse = serde_json::from_slice(&bytes)
            .map_err(|e| CredentialFetchError::Malformed(e.to_string()))?;

        if parsed.server_url.is_empty() {
            return Err(CredentialFetchError::Malformed("empty serverUrl".to_string()));
        }
        if parsed.participant_token.is_empty() {
            return Err(CredentialFetchError::Malformed(
                "empty participantToken".to_string(),
            ));
        }

        Ok(parsed.into_details(self.fallback_ttl))
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn acquire(&self) -> Result<ConnectionDetails, CredentialFetchError> {
        info!("Fetching connection details from {}", self.url);

        match self.fetch().await {
            Ok(details) => {
                info!(
                    "Acquired connection details for {} (expires {})",
                    details.server_url, details.expires_at
                );
                if let Ok(mut cache) = self.cache.write() {
                    *cache = Some(details.clone());
                }
                Ok(details)
            }
            Err(e) => {
                warn!("Failed to fetch connection details: {}", e);
                Err(e)
            }
        }
    }

    fn latest(&self) -> Option<ConnectionDetails> {
        self.cache.read().ok().and_then(|cache| cache.clone())
    }
}
