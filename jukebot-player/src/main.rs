//! jukebot-player - Main entry point
//!
//! Per-session media playback service: resolves queries to playable tracks
//! with yt-dlp, renders them through ffplay, and exposes the session command
//! surface over HTTP with an SSE event stream.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jukebot_common::EventBus;
use jukebot_player::api::{self, AppContext, SinkFactory};
use jukebot_player::config::Config;
use jukebot_player::playback::PlayerSettings;
use jukebot_player::resolver::YtDlpResolver;
use jukebot_player::sink::{FfplaySink, PlaybackSink};
use jukebot_player::SessionRegistry;

/// Command-line arguments for jukebot-player
#[derive(Parser, Debug)]
#[command(name = "jukebot-player")]
#[command(about = "Per-session media playback service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "JUKEBOT_PORT")]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long, default_value = "jukebot.toml", env = "JUKEBOT_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebot_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = Config::load(&args.config).context("Failed to load configuration")?;
    let port = args.port.unwrap_or(config.port);

    info!("Starting jukebot-player on port {}", port);
    info!(
        "Idle timeout {:?}, history limit {}, resolver '{}'",
        config.idle_timeout(),
        config.history_limit,
        config.resolver_program
    );

    let events = EventBus::new(config.event_capacity);
    let registry = SessionRegistry::new(
        events.clone(),
        PlayerSettings {
            idle_timeout: config.idle_timeout(),
            history_limit: config.history_limit,
            fallback_query: config.autoplay_fallback_query.clone(),
        },
    );

    let resolver = Arc::new(YtDlpResolver::with_program(&config.resolver_program));
    let sink_factory: SinkFactory =
        Arc::new(|_session_id| Arc::new(FfplaySink::new()) as Arc<dyn PlaybackSink>);

    let ctx = AppContext {
        registry: registry.clone(),
        events,
        resolver,
        sink_factory,
    };

    api::server::run(port, ctx)
        .await
        .context("HTTP server error")?;

    // Graceful shutdown: tear every live session down before exiting
    registry.destroy_all().await;

    info!("Server shutdown complete");
    Ok(())
}
