// Tests for HttpCredentialSource against a local token endpoint

use agent_embed::config::{CredentialsConfig, WidgetConfig};
use agent_embed::credentials::{CredentialSource, HttpCredentialSource};
use agent_embed::error::CredentialFetchError;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use base64::Engine;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct Endpoint {
    status: StatusCode,
    body: Value,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Endpoint {
    fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn connection_details(
    State(endpoint): State<Endpoint>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let n = endpoint.calls.fetch_add(1, Ordering::SeqCst);
    let sandbox = headers
        .get("X-Sandbox-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    endpoint.seen.lock().unwrap().push((sandbox, body));

    let mut response = endpoint.body.clone();
    if let Some(token) = response.get_mut("participantToken") {
        if *token == "rotating" {
            *token = json!(format!("token-{}", n));
        }
    }
    (endpoint.status, Json(response))
}

/// Serve `endpoint` on an ephemeral port and return its origin
async fn serve(endpoint: Endpoint) -> String {
    let app = Router::new()
        .route("/api/connection-details", post(connection_details))
        .with_state(endpoint);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn credentials_config(origin: &str) -> CredentialsConfig {
    CredentialsConfig {
        origin: origin.to_string(),
        endpoint: "/api/connection-details".to_string(),
        sandbox_id: None,
        token_ttl_secs: 600,
    }
}

fn ok_body() -> Value {
    json!({
        "serverUrl": "wss://agents.example.com",
        "roomName": "voice_assistant_room_42",
        "participantName": "user",
        "participantToken": "rotating"
    })
}

#[tokio::test]
async fn test_acquire_and_cache() {
    let endpoint = Endpoint::new(StatusCode::OK, ok_body());
    let origin = serve(endpoint.clone()).await;
    let source = HttpCredentialSource::new(&credentials_config(&origin), &WidgetConfig::default());

    assert!(source.latest().is_none());

    let details = source.acquire().await.unwrap();
    assert_eq!(details.server_url, "wss://agents.example.com");
    assert_eq!(details.participant_token, "token-0");
    assert_eq!(details.room_name.as_deref(), Some("voice_assistant_room_42"));
    assert!(!details.is_expired());
    assert_eq!(source.latest(), Some(details));

    let refreshed = source.refresh().await.unwrap();
    assert_eq!(refreshed.participant_token, "token-1");
    assert_eq!(
        source.latest().unwrap().participant_token,
        "token-1".to_string()
    );
    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_sends_sandbox_header_and_agent_name() {
    let endpoint = Endpoint::new(StatusCode::OK, ok_body());
    let origin = serve(endpoint.clone()).await;

    let mut config = credentials_config(&origin);
    config.sandbox_id = Some("sandbox-123".to_string());
    let widget = WidgetConfig {
        agent_name: Some("concierge".to_string()),
        ..WidgetConfig::default()
    };
    let source = HttpCredentialSource::new(&config, &widget);
    source.acquire().await.unwrap();

    let seen = endpoint.seen.lock().unwrap();
    let (sandbox, body) = &seen[0];
    assert_eq!(sandbox.as_deref(), Some("sandbox-123"));
    assert_eq!(
        body["room_config"]["agents"][0]["agent_name"],
        json!("concierge")
    );
}

#[tokio::test]
async fn test_empty_body_without_agent_name() {
    let endpoint = Endpoint::new(StatusCode::OK, ok_body());
    let origin = serve(endpoint.clone()).await;
    let source = HttpCredentialSource::new(&credentials_config(&origin), &WidgetConfig::default());
    source.acquire().await.unwrap();

    let seen = endpoint.seen.lock().unwrap();
    assert_eq!(seen[0], (None, json!({})));
}

#[tokio::test]
async fn test_error_status() {
    let endpoint = Endpoint::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "LIVEKIT_URL is not defined" }),
    );
    let origin = serve(endpoint).await;
    let source = HttpCredentialSource::new(&credentials_config(&origin), &WidgetConfig::default());

    match source.acquire().await {
        Err(CredentialFetchError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.contains("LIVEKIT_URL"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert!(source.latest().is_none());
}

#[tokio::test]
async fn test_missing_fields_are_malformed() {
    let endpoint = Endpoint::new(StatusCode::OK, json!({ "serverUrl": "wss://x" }));
    let origin = serve(endpoint).await;
    let source = HttpCredentialSource::new(&credentials_config(&origin), &WidgetConfig::default());

    assert!(matches!(
        source.acquire().await,
        Err(CredentialFetchError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_empty_fields_are_malformed() {
    let endpoint = Endpoint::new(
        StatusCode::OK,
        json!({ "serverUrl": "", "participantToken": "t1" }),
    );
    let origin = serve(endpoint).await;
    let source = HttpCredentialSource::new(&credentials_config(&origin), &WidgetConfig::default());

    match source.acquire().await {
        Err(CredentialFetchError::Malformed(message)) => assert!(message.contains("serverUrl")),
        other => panic!("expected malformed error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = HttpCredentialSource::new(
        &credentials_config(&format!("http://{}", addr)),
        &WidgetConfig::default(),
    );
    assert!(matches!(
        source.acquire().await,
        Err(CredentialFetchError::Request(_))
    ));
}

#[tokio::test]
async fn test_expiry_from_token_claim() {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let token = format!(
        "{}.{}.sig",
        engine.encode(r#"{"alg":"HS256"}"#),
        engine.encode(r#"{"exp":4102444800}"#)
    );
    let endpoint = Endpoint::new(
        StatusCode::OK,
        json!({ "serverUrl": "wss://x", "participantToken": token }),
    );
    let origin = serve(endpoint).await;
    let source = HttpCredentialSource::new(&credentials_config(&origin), &WidgetConfig::default());

    let details = source.acquire().await.unwrap();
    assert_eq!(details.expires_at.timestamp(), 4_102_444_800);
}

#[tokio::test]
async fn test_out_of_range_ttl_falls_back_to_default() {
    let endpoint = Endpoint::new(
        StatusCode::OK,
        json!({ "serverUrl": "wss://x", "participantToken": "opaque" }),
    );
    let origin = serve(endpoint).await;
    let mut config = credentials_config(&origin);
    config.token_ttl_secs = u64::MAX;

    let source = HttpCredentialSource::new(&config, &WidgetConfig::default());
    let details = source.acquire().await.unwrap();

    let remaining = details.expires_at - chrono::Utc::now();
    assert!(remaining <= chrono::Duration::seconds(600));
    assert!(remaining > chrono::Duration::seconds(590));
}

#[test]
fn test_url_joins_origin_and_endpoint() {
    let mut config = credentials_config("https://sandbox.example.com/");
    config.endpoint = "api/token".to_string();
    let source = HttpCredentialSource::new(&config, &WidgetConfig::default());
    assert_eq!(source.url(), "https://sandbox.example.com/api/token");
}
