//! voice-ops Web Server
//!
//! Serves the voice gateway, the conversational helper endpoints and the
//! navigation command queue with its SSE push channel.

mod state;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_ops::VoiceConfig;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_ops=debug,voice_ops_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting voice-ops web server");

    let config = VoiceConfig::from_env();
    tracing::info!(
        interpreter_url = %config.interpreter_url,
        dispatch_mode = %config.dispatch_mode,
        timeout_secs = config.http_timeout.as_secs(),
        "Configuration loaded"
    );

    let state = AppState::from_config(config)?;
    let port = state.config.server_port;
    let app = build_app(&state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("");
    tracing::info!("===========================================");
    tracing::info!("  voice-ops running on http://{}", addr);
    tracing::info!("===========================================");
    tracing::info!("");
    tracing::info!("API Endpoints:");
    tracing::info!("  /api/voice-command       - Interpret a transcript");
    tracing::info!("  /api/voice/context       - Conversational context");
    tracing::info!("  /api/voice/selection/*   - Disambiguation");
    tracing::info!("  /api/commands/stream     - Navigation command feed (SSE)");
    tracing::info!("  /api/commands/navigate   - Backend navigate tool");
    tracing::info!("");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!("Port {} is already in use", port);
            }
            return Err(e).with_context(|| format!("Failed to bind to {}", addr));
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("voice-ops web server stopped");
    Ok(())
}

fn build_app(state: &AppState) -> Router {
    // CORS for browser clients on other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    voice_ops::api::router(state.voice.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
