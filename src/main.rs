use agent_embed::{
    create_router, AlertLog, AppState, Config, HttpCredentialSource, SessionController,
    SimulatedRoom, SimulatedRoomConfig,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "agent-embed", version, about = "Embeddable voice agent session service")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/agent-embed")]
    config: String,

    /// Use the in-process simulated room as the transport
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Agent Embed v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    if !args.simulate {
        anyhow::bail!(
            "No room transport is bundled with this build; run with --simulate for the in-process room"
        );
    }

    let credentials = Arc::new(HttpCredentialSource::new(&cfg.credentials, &cfg.widget));
    info!("Connection details endpoint: {}", credentials.url());

    let (room, room_events) = SimulatedRoom::new(SimulatedRoomConfig::default());
    let alerts = Arc::new(AlertLog::default());

    let (session, _controller) = SessionController::spawn(
        cfg.session(),
        credentials.clone(),
        Arc::new(room),
        room_events,
        alerts.clone(),
    );

    let app = create_router(AppState::new(session, credentials, alerts));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Control API listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
