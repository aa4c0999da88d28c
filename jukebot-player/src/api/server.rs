//! HTTP server setup and routing
//!
//! Sets up the Axum HTTP server: per-session control endpoints under
//! /sessions/:session_id, plus health and the SSE event stream.

use crate::error::{Error, Result};
use crate::registry::SessionRegistry;
use crate::resolver::MediaResolver;
use crate::sink::PlaybackSink;
use axum::{
    routing::{delete, get, post},
    Router,
};
use jukebot_common::EventBus;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Builds the playback sink for a newly created session
pub type SinkFactory = Arc<dyn Fn(&str) -> Arc<dyn PlaybackSink> + Send + Sync>;

/// Shared application context passed to all handlers
///
/// **Note:** AppContext implements Clone, which gives us `FromRef<AppContext>`
/// for free via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub registry: SessionRegistry,
    pub events: EventBus,
    pub resolver: Arc<dyn MediaResolver>,
    pub sink_factory: SinkFactory,
}

/// Build the router with all routes attached
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Session command surface
        .route("/sessions/:session_id/queue", post(super::handlers::enqueue))
        .route("/sessions/:session_id/queue", get(super::handlers::get_queue))
        .route("/sessions/:session_id/play-now", post(super::handlers::play_now))
        .route("/sessions/:session_id/autoplay", post(super::handlers::toggle_autoplay))
        .route("/sessions/:session_id/stop", post(super::handlers::stop))
        .route("/sessions/:session_id/skip", post(super::handlers::skip))
        .route("/sessions/:session_id/volume", post(super::handlers::set_volume))
        .route("/sessions/:session_id/pause", post(super::handlers::pause))
        .route("/sessions/:session_id/resume", post(super::handlers::resume))
        .route("/sessions/:session_id/now-playing", get(super::handlers::now_playing))
        .route("/sessions/:session_id", delete(super::handlers::destroy_session))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        // Attach application context
        .with_state(ctx)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until it fails or the process exits
pub async fn run(port: u16, ctx: AppContext) -> Result<()> {
    let app = build_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}

/// Resolve on ctrl-c or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
