use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Server URL and participant token for one connection attempt.
///
/// Issued by the credential endpoint and never mutated afterwards; a new
/// acquisition produces a new value that supersedes the cached one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    pub server_url: String,
    pub participant_token: String,
    pub expires_at: DateTime<Utc>,
    pub room_name: Option<String>,
    pub participant_name: Option<String>,
}

impl ConnectionDetails {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Body returned by the connection details endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConnectionDetailsResponse {
    pub server_url: String,
    pub participant_token: String,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub participant_name: Option<String>,
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Reads the `exp` claim from a JWT without verifying its signature.
///
/// The token is opaque to this client; only its lifetime is of interest.
pub(crate) fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claim.exp?, 0).single()
}

impl ConnectionDetailsResponse {
    pub(crate) fn into_details(self, fallback_ttl: Duration) -> ConnectionDetails {
        let expires_at =
            token_expiry(&self.participant_token).unwrap_or_else(|| Utc::now() + fallback_ttl);

        ConnectionDetails {
            server_url: self.server_url,
            participant_token: self.participant_token,
            expires_at,
            room_name: self.room_name,
            participant_name: self.participant_name,
        }
    }
}
