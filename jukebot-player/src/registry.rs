//! Session registry
//!
//! Single authority mapping session id to live `SessionPlayer`. Creating a
//! session spawns its loop task; the loop ending (idle timeout) or an
//! explicit destroy removes the entry and tears the sink down. All lookups
//! and teardowns go through here so a session can never leak its loop task.

use crate::playback::{LoopExit, PlayerSettings, SessionPlayer};
use crate::resolver::MediaResolver;
use crate::sink::PlaybackSink;
use chrono::Utc;
use jukebot_common::{DestroyReason, EventBus, SessionEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

struct SessionEntry {
    player: Arc<SessionPlayer>,
    shutdown: watch::Sender<bool>,
}

struct Inner {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    events: EventBus,
    settings: PlayerSettings,
}

/// Shared handle to the session map
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

impl SessionRegistry {
    pub fn new(events: EventBus, settings: PlayerSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: RwLock::new(HashMap::new()),
                events,
                settings,
            }),
        }
    }

    /// Look up a live session
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionPlayer>> {
        self.inner
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| Arc::clone(&entry.player))
    }

    /// Look up a session, creating (and starting) it when absent.
    ///
    /// `init` builds the session's collaborators and is only called when a
    /// new session is actually created. Concurrent callers for the same id
    /// get the same player; exactly one loop task runs per session.
    pub async fn get_or_create<F>(&self, session_id: &str, init: F) -> Arc<SessionPlayer>
    where
        F: FnOnce() -> (Arc<dyn MediaResolver>, Arc<dyn PlaybackSink>),
    {
        let mut sessions = self.inner.sessions.write().await;
        if let Some(entry) = sessions.get(session_id) {
            return Arc::clone(&entry.player);
        }

        let (resolver, sink) = init();
        let player = Arc::new(SessionPlayer::new(
            session_id,
            resolver,
            sink,
            self.inner.events.clone(),
            self.inner.settings.clone(),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                player: Arc::clone(&player),
                shutdown: shutdown_tx,
            },
        );
        drop(sessions);

        info!("session {} created", session_id);
        let registry = self.clone();
        let loop_player = Arc::clone(&player);
        tokio::spawn(async move {
            let exit = Arc::clone(&loop_player).run(shutdown_rx).await;
            registry.finish(loop_player, exit).await;
        });

        player
    }

    /// Cleanup after a session loop returns
    async fn finish(&self, player: Arc<SessionPlayer>, exit: LoopExit) {
        match exit {
            LoopExit::IdleTimeout => {
                let mut sessions = self.inner.sessions.write().await;
                // Only evict our own entry: a same-id session may have been
                // destroyed and recreated while the old loop was winding
                // down.
                let ours = sessions
                    .get(player.id())
                    .is_some_and(|entry| Arc::ptr_eq(&entry.player, &player));
                if ours {
                    sessions.remove(player.id());
                    drop(sessions);

                    player.disconnect();
                    info!("session {} evicted after idle timeout", player.id());
                    self.inner.events.emit_lossy(SessionEvent::SessionDestroyed {
                        session_id: player.id().to_string(),
                        reason: DestroyReason::Idle,
                        timestamp: Utc::now(),
                    });
                }
            }
            LoopExit::Shutdown => {
                // destroy() already removed the entry and emitted the event
                debug!("session {} loop stopped on shutdown", player.id());
            }
        }
    }

    /// Explicitly tear a session down. Idempotent; destroying an unknown
    /// session is a no-op returning false.
    pub async fn destroy(&self, session_id: &str) -> bool {
        let entry = self.inner.sessions.write().await.remove(session_id);
        let Some(entry) = entry else {
            return false;
        };

        // Wake the loop out of its queue wait, then silence the sink. The
        // loop observes the flag and exits without touching the registry.
        let _ = entry.shutdown.send(true);
        entry.player.stop();
        entry.player.disconnect();

        info!("session {} destroyed on request", session_id);
        self.inner.events.emit_lossy(SessionEvent::SessionDestroyed {
            session_id: session_id.to_string(),
            reason: DestroyReason::Requested,
            timestamp: Utc::now(),
        });
        true
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.sessions.read().await.is_empty()
    }

    /// Tear down every session (process shutdown)
    pub async fn destroy_all(&self) {
        let ids: Vec<String> = self.inner.sessions.read().await.keys().cloned().collect();
        for id in ids {
            self.destroy(&id).await;
        }
    }
}
