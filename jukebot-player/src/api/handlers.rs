//! HTTP request handlers
//!
//! Implements the per-session REST endpoints. Commands that imply intent to
//! play (enqueue, play-now, autoplay toggle) create the session on first
//! use; commands that only make sense against live playback (stop, skip,
//! volume, pause, resume) reject unknown sessions instead.

use crate::api::server::AppContext;
use crate::error::Error;
use crate::playback::{PlayerState, QueueItem, SessionPlayer};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use jukebot_common::Track;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    query: String,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    status: String,
    position: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    queue: Vec<QueueEntryInfo>,
}

#[derive(Debug, Serialize)]
pub struct QueueEntryInfo {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    resolved: bool,
}

#[derive(Debug, Serialize)]
pub struct AutoplayResponse {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    volume: i64, // 1-100 user-facing scale
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    volume: u8,
}

#[derive(Debug, Serialize)]
pub struct NowPlayingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    track: Option<Track>,
    state: PlayerState,
    autoplay: bool,
    volume: u8,
    queue_length: usize,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

fn error_response(code: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        code,
        Json(StatusResponse {
            status: message.into(),
        }),
    )
}

fn not_connected() -> HandlerError {
    error_response(StatusCode::CONFLICT, Error::NotConnected.to_string())
}

/// Look up a session that must already exist
async fn require_session(
    ctx: &AppContext,
    session_id: &str,
) -> Result<Arc<SessionPlayer>, HandlerError> {
    ctx.registry.get(session_id).await.ok_or_else(not_connected)
}

/// Look up a session, starting it when absent
async fn session(ctx: &AppContext, session_id: &str) -> Arc<SessionPlayer> {
    let resolver = Arc::clone(&ctx.resolver);
    let sink_factory = Arc::clone(&ctx.sink_factory);
    ctx.registry
        .get_or_create(session_id, || (resolver, sink_factory(session_id)))
        .await
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "session_player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Session Command Endpoints
// ============================================================================

/// POST /sessions/:session_id/queue - Append a request to the queue
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Json<EnqueueResponse> {
    let player = session(&ctx, &session_id).await;
    player.enqueue(&req.query);
    info!("session {} enqueued '{}'", session_id, req.query);

    Json(EnqueueResponse {
        status: "queued".to_string(),
        position: player.queue_snapshot().len(),
    })
}

/// GET /sessions/:session_id/queue - Ordered queue snapshot
///
/// An unknown session simply has nothing queued.
pub async fn get_queue(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Json<QueueResponse> {
    let queue = match ctx.registry.get(&session_id).await {
        Some(player) => player
            .queue_snapshot()
            .into_iter()
            .map(|item| QueueEntryInfo {
                title: item.title().to_string(),
                url: item.url().map(String::from),
                resolved: matches!(item, QueueItem::Resolved(_)),
            })
            .collect(),
        None => Vec::new(),
    };

    Json(QueueResponse { queue })
}

/// POST /sessions/:session_id/play-now - Resolve, wipe the queue, play next
pub async fn play_now(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Track>, HandlerError> {
    let player = session(&ctx, &session_id).await;

    match player.play_now(&req.query).await {
        Ok(track) => {
            info!("session {} playing now: '{}'", session_id, track.title);
            Ok(Json(track))
        }
        Err(e @ Error::Resolution(_)) => {
            Err(error_response(StatusCode::NOT_FOUND, e.to_string()))
        }
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}

/// POST /sessions/:session_id/autoplay - Toggle autoplay, returning the new
/// state
pub async fn toggle_autoplay(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Json<AutoplayResponse> {
    let player = session(&ctx, &session_id).await;
    let enabled = player.toggle_autoplay();
    info!("session {} autoplay {}", session_id, if enabled { "on" } else { "off" });

    Json(AutoplayResponse { enabled })
}

/// POST /sessions/:session_id/stop - Clear the queue and halt playback
pub async fn stop(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, HandlerError> {
    let player = require_session(&ctx, &session_id).await?;
    player.stop();

    Ok(Json(StatusResponse {
        status: "stopped".to_string(),
    }))
}

/// POST /sessions/:session_id/skip - Cut the current track short
pub async fn skip(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, HandlerError> {
    let player = require_session(&ctx, &session_id).await?;

    let status = if player.skip().await {
        "skipped"
    } else {
        "nothing playing"
    };
    Ok(Json(StatusResponse {
        status: status.to_string(),
    }))
}

/// POST /sessions/:session_id/volume - Set session volume (1-100)
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<VolumeResponse>, HandlerError> {
    let player = require_session(&ctx, &session_id).await?;

    match player.set_volume(req.volume) {
        Ok(volume) => Ok(Json(VolumeResponse { volume })),
        Err(e @ Error::VolumeOutOfRange(_)) => {
            Err(error_response(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}

/// POST /sessions/:session_id/pause - Pause the current track
pub async fn pause(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, HandlerError> {
    let player = require_session(&ctx, &session_id).await?;

    let status = if player.pause().await {
        "paused"
    } else {
        "nothing playing"
    };
    Ok(Json(StatusResponse {
        status: status.to_string(),
    }))
}

/// POST /sessions/:session_id/resume - Resume a paused track
pub async fn resume(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, HandlerError> {
    let player = require_session(&ctx, &session_id).await?;

    let status = if player.resume().await {
        "resumed"
    } else {
        "nothing playing"
    };
    Ok(Json(StatusResponse {
        status: status.to_string(),
    }))
}

/// GET /sessions/:session_id/now-playing - Current track and player state
pub async fn now_playing(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Json<NowPlayingResponse> {
    match ctx.registry.get(&session_id).await {
        Some(player) => Json(NowPlayingResponse {
            track: player.now_playing().await,
            state: player.state(),
            autoplay: player.autoplay_enabled(),
            volume: player.volume(),
            queue_length: player.queue_snapshot().len(),
        }),
        None => Json(NowPlayingResponse {
            track: None,
            state: PlayerState::Destroyed,
            autoplay: false,
            volume: 0,
            queue_length: 0,
        }),
    }
}

/// DELETE /sessions/:session_id - Explicit session teardown
///
/// Idempotent: deleting an unknown session still returns 204.
pub async fn destroy_session(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> StatusCode {
    ctx.registry.destroy(&session_id).await;
    StatusCode::NO_CONTENT
}
