//! Per-session player state machine
//!
//! One `SessionPlayer` owns the queue, history, and playback state for a
//! single session, driven by exactly one `run` task. Command handlers call
//! the player's methods from any task; the loop is the only consumer of the
//! queue and the only caller of `sink.play`.
//!
//! Loop cycle: wait for a queue item (bounded by the idle timeout), resolve
//! it if it is still a raw query, hand it to the sink, await the completion
//! signal, then optionally self-feed one autoplay candidate. An empty queue
//! past the idle timeout ends the loop; the registry tears the session down.

use crate::error::{Error, Result};
use crate::playback::autoplay;
use crate::playback::history::PlayHistory;
use crate::playback::queue::{QueueItem, TrackQueue};
use crate::resolver::MediaResolver;
use crate::sink::{Completion, PlaybackSink};
use chrono::Utc;
use jukebot_common::{EventBus, SessionEvent, Track};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

/// Default user-facing volume (1-100 scale)
pub const DEFAULT_VOLUME: u8 = 50;

/// Tunables shared by every session
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    /// How long the loop waits on an empty queue before giving up
    pub idle_timeout: Duration,
    /// Play history cap
    pub history_limit: usize,
    /// Search used when autoplay has no related candidates
    pub fallback_query: String,
}

/// Where the session loop currently is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// Waiting on the queue
    Idle,
    /// Resolving a raw query off the loop
    Resolving,
    /// A track is with the sink
    Playing,
    /// Loop has exited; terminal
    Destroyed,
}

/// Why `run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Queue stayed empty past the idle timeout. Normal lifecycle, not an
    /// error.
    IdleTimeout,
    /// Shutdown was signalled (explicit destroy or process exit)
    Shutdown,
}

/// State and command surface for one session
pub struct SessionPlayer {
    id: String,
    queue: TrackQueue,
    resolver: Arc<dyn MediaResolver>,
    sink: Arc<dyn PlaybackSink>,
    events: EventBus,
    settings: PlayerSettings,
    history: Mutex<PlayHistory>,
    current: RwLock<Option<Track>>,
    state: Mutex<PlayerState>,
    autoplay: AtomicBool,
    /// Sink scale (0.0-1.0); user commands speak 1-100
    volume: Mutex<f32>,
}

impl SessionPlayer {
    pub fn new(
        id: impl Into<String>,
        resolver: Arc<dyn MediaResolver>,
        sink: Arc<dyn PlaybackSink>,
        events: EventBus,
        settings: PlayerSettings,
    ) -> Self {
        let history_limit = settings.history_limit;
        Self {
            id: id.into(),
            queue: TrackQueue::new(),
            resolver,
            sink,
            events,
            settings,
            history: Mutex::new(PlayHistory::new(history_limit)),
            current: RwLock::new(None),
            state: Mutex::new(PlayerState::Idle),
            autoplay: AtomicBool::new(false),
            volume: Mutex::new(DEFAULT_VOLUME as f32 / 100.0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> PlayerState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: PlayerState) {
        *self.state.lock().unwrap() = state;
    }

    /// Drive the session until idle timeout or shutdown.
    ///
    /// Must be spawned exactly once per player; the registry owns that
    /// invariant.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> LoopExit {
        info!("session {} loop started", self.id);
        loop {
            self.set_state(PlayerState::Idle);

            let item = tokio::select! {
                item = self.queue.pop(self.settings.idle_timeout) => item,
                _ = shutdown.changed() => {
                    self.set_state(PlayerState::Destroyed);
                    return LoopExit::Shutdown;
                }
            };
            let Some(item) = item else {
                info!(
                    "session {} idle for {:?}, ending loop",
                    self.id, self.settings.idle_timeout
                );
                self.set_state(PlayerState::Destroyed);
                return LoopExit::IdleTimeout;
            };

            let track = match item {
                QueueItem::Resolved(track) => track,
                QueueItem::Query(query) => {
                    match self.resolve_query(query).await {
                        Some(track) => track,
                        None => continue,
                    }
                }
            };

            self.play_one(track).await;

            if *shutdown.borrow() {
                self.set_state(PlayerState::Destroyed);
                return LoopExit::Shutdown;
            }

            if self.autoplay_enabled() && self.queue.is_empty() {
                self.feed_autoplay().await;
            }
        }
    }

    /// Resolve a raw query off the loop thread. `None` means the cycle
    /// should move on: resolution failed (reported) or the queue was wiped
    /// while we were resolving.
    async fn resolve_query(&self, query: String) -> Option<Track> {
        self.set_state(PlayerState::Resolving);
        let epoch = self.queue.epoch();

        let resolver = Arc::clone(&self.resolver);
        let q = query.clone();
        let resolved = tokio::task::spawn_blocking(move || resolver.resolve(&q)).await;

        let track = match resolved {
            Ok(Ok(track)) => track,
            Ok(Err(e)) => {
                warn!("session {} failed to resolve '{}': {}", self.id, query, e);
                self.emit(SessionEvent::ResolutionFailed {
                    session_id: self.id.clone(),
                    query,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                return None;
            }
            Err(e) => {
                warn!("session {} resolver task panicked: {}", self.id, e);
                self.emit(SessionEvent::ResolutionFailed {
                    session_id: self.id.clone(),
                    query,
                    reason: "resolver task failed".to_string(),
                    timestamp: Utc::now(),
                });
                return None;
            }
        };

        if self.queue.epoch() != epoch {
            // Queue was cleared or replaced mid-resolution; this request no
            // longer belongs to the session's current intent.
            debug!(
                "session {} discarding late resolution of '{}'",
                self.id, track.title
            );
            return None;
        }

        Some(track)
    }

    /// Play one resolved track to completion
    async fn play_one(&self, track: Track) {
        self.set_state(PlayerState::Playing);
        self.history.lock().unwrap().push(track.id.clone());
        *self.current.write().await = Some(track.clone());

        self.emit(SessionEvent::TrackStarted {
            session_id: self.id.clone(),
            track: track.clone(),
            timestamp: Utc::now(),
        });

        let (done, rx) = Completion::channel();
        let volume = *self.volume.lock().unwrap();

        let errored = match self.sink.play(&track, volume, done) {
            Ok(()) => match rx.await {
                Ok(None) => false,
                Ok(Some(reason)) => {
                    warn!("session {} playback of '{}' failed: {}", self.id, track.title, reason);
                    true
                }
                // Completion's Drop guarantees a signal; treat a closed
                // channel as an errored finish anyway.
                Err(_) => true,
            },
            Err(e) => {
                warn!("session {} sink rejected '{}': {}", self.id, track.title, e);
                true
            }
        };

        *self.current.write().await = None;
        self.emit(SessionEvent::TrackFinished {
            session_id: self.id.clone(),
            track_id: track.id,
            errored,
            timestamp: Utc::now(),
        });
    }

    /// Self-feed one autoplay candidate after a track finishes with the
    /// queue empty
    async fn feed_autoplay(&self) {
        let resolver = Arc::clone(&self.resolver);
        let history = self.history.lock().unwrap().clone();
        let fallback = self.settings.fallback_query.clone();

        let candidate = tokio::task::spawn_blocking(move || {
            autoplay::next_candidate(resolver.as_ref(), &history, &fallback)
        })
        .await;

        match candidate {
            Ok(Some(next)) => {
                info!("session {} autoplay queued '{}'", self.id, next.title);
                self.queue.push(QueueItem::Resolved(next));
                self.emit(SessionEvent::QueueChanged {
                    session_id: self.id.clone(),
                    timestamp: Utc::now(),
                });
            }
            Ok(None) => {
                debug!("session {} autoplay found no candidate", self.id);
                self.emit(SessionEvent::AutoplayExhausted {
                    session_id: self.id.clone(),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!("session {} autoplay task panicked: {}", self.id, e);
                self.emit(SessionEvent::AutoplayExhausted {
                    session_id: self.id.clone(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    // ---- command surface ----

    /// Append a request to the queue
    pub fn enqueue(&self, query: impl Into<String>) {
        self.queue.push(QueueItem::Query(query.into()));
        self.emit(SessionEvent::QueueChanged {
            session_id: self.id.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Resolve `query` eagerly, wipe the queue, and make it the next thing
    /// played. Returns the resolved track so the caller can echo it.
    ///
    /// Resolution happens before the queue is touched: a bad query leaves
    /// the session exactly as it was.
    pub async fn play_now(&self, query: impl Into<String>) -> Result<Track> {
        let query = query.into();
        let resolver = Arc::clone(&self.resolver);
        let q = query.clone();
        let track = tokio::task::spawn_blocking(move || resolver.resolve(&q))
            .await
            .map_err(|e| Error::Internal(format!("resolver task failed: {}", e)))??;

        // Replace first (bumps the epoch, invalidating in-flight
        // resolutions), then cut the current track short so the loop picks
        // up the new front item.
        self.queue.replace(QueueItem::Resolved(track.clone()));
        self.sink.stop();

        self.emit(SessionEvent::QueueChanged {
            session_id: self.id.clone(),
            timestamp: Utc::now(),
        });
        Ok(track)
    }

    /// Flip the autoplay flag, returning the new value
    pub fn toggle_autoplay(&self) -> bool {
        let enabled = !self.autoplay.fetch_xor(true, Ordering::SeqCst);
        self.emit(SessionEvent::AutoplayChanged {
            session_id: self.id.clone(),
            enabled,
            timestamp: Utc::now(),
        });
        enabled
    }

    pub fn autoplay_enabled(&self) -> bool {
        self.autoplay.load(Ordering::SeqCst)
    }

    /// Halt playback and drop everything queued. The session stays alive
    /// (and idle-times-out later if nothing else arrives).
    pub fn stop(&self) {
        self.queue.clear();
        self.sink.stop();
        self.emit(SessionEvent::QueueChanged {
            session_id: self.id.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Cut the current track short; the loop advances to the next queue
    /// item on its own. Returns false when nothing is playing.
    pub async fn skip(&self) -> bool {
        if self.current.read().await.is_some() {
            self.sink.stop();
            true
        } else {
            false
        }
    }

    /// Set the session volume on the user-facing 1-100 scale
    pub fn set_volume(&self, requested: i64) -> Result<u8> {
        if !(1..=100).contains(&requested) {
            return Err(Error::VolumeOutOfRange(requested));
        }
        let volume = requested as u8;
        *self.volume.lock().unwrap() = volume as f32 / 100.0;
        self.sink.set_volume(volume as f32 / 100.0);
        self.emit(SessionEvent::VolumeChanged {
            session_id: self.id.clone(),
            volume,
            timestamp: Utc::now(),
        });
        Ok(volume)
    }

    /// Current volume on the user-facing 1-100 scale
    pub fn volume(&self) -> u8 {
        (*self.volume.lock().unwrap() * 100.0).round() as u8
    }

    /// Pause the current track. Returns false when nothing is playing.
    pub async fn pause(&self) -> bool {
        if self.current.read().await.is_some() {
            self.sink.pause();
            true
        } else {
            false
        }
    }

    /// Resume a paused track. Returns false when nothing is playing.
    pub async fn resume(&self) -> bool {
        if self.current.read().await.is_some() {
            self.sink.resume();
            true
        } else {
            false
        }
    }

    /// Pending queue items in playback order (excludes the current track)
    pub fn queue_snapshot(&self) -> Vec<QueueItem> {
        self.queue.snapshot()
    }

    pub async fn now_playing(&self) -> Option<Track> {
        self.current.read().await.clone()
    }

    /// Tear down the sink's underlying connection
    pub fn disconnect(&self) {
        self.sink.disconnect();
    }

    fn emit(&self, event: SessionEvent) {
        self.events.emit_lossy(event);
    }
}
