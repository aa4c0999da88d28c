//! Shared test helpers: scripted resolver and sink doubles

// Not every test binary uses every helper
#![allow(dead_code)]

use jukebot_common::Track;
use jukebot_player::error::{Error, Result};
use jukebot_player::resolver::MediaResolver;
use jukebot_player::sink::{Completion, PlaybackSink};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Title {}", id),
        stream_url: format!("https://example.com/{}", id),
        thumbnail: None,
        uploader: Some("Test Channel".to_string()),
    }
}

/// Scripted resolver: maps queries and ids to canned tracks, with optional
/// per-call blocking delay to exercise the resolution race paths.
#[derive(Default)]
pub struct FakeResolver {
    by_query: Mutex<HashMap<String, Track>>,
    by_id: Mutex<HashMap<String, Track>>,
    searches: Mutex<HashMap<String, Vec<Track>>>,
    related: Mutex<HashMap<String, Vec<String>>>,
    delays: Mutex<HashMap<String, Duration>>,
    resolve_calls: Mutex<Vec<String>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `query` resolve to a track with the given id
    pub fn on_query(self, query: &str, id: &str) -> Self {
        let t = track(id);
        self.by_query.lock().unwrap().insert(query.to_string(), t.clone());
        self.by_id.lock().unwrap().insert(id.to_string(), t);
        self
    }

    /// Make a multi-result search for `query` return tracks with these ids
    pub fn on_search(self, query: &str, ids: &[&str]) -> Self {
        self.searches
            .lock()
            .unwrap()
            .insert(query.to_string(), ids.iter().map(|id| track(id)).collect());
        self
    }

    pub fn with_related(self, id: &str, related: &[&str]) -> Self {
        for r in related {
            self.by_id.lock().unwrap().insert(r.to_string(), track(r));
        }
        self.related
            .lock()
            .unwrap()
            .insert(id.to_string(), related.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Make resolving `query` block for `delay` first
    pub fn with_delay_on(self, query: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(query.to_string(), delay);
        self
    }

    pub fn resolve_calls(&self) -> Vec<String> {
        self.resolve_calls.lock().unwrap().clone()
    }
}

impl MediaResolver for FakeResolver {
    fn resolve(&self, query: &str) -> Result<Track> {
        let delay = self.delays.lock().unwrap().get(query).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.resolve_calls.lock().unwrap().push(query.to_string());
        self.by_query
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or_else(|| Error::Resolution(format!("no results for '{}'", query)))
    }

    fn resolve_id(&self, track_id: &str) -> Result<Track> {
        self.by_id
            .lock()
            .unwrap()
            .get(track_id)
            .cloned()
            .ok_or_else(|| Error::Resolution(format!("unknown id '{}'", track_id)))
    }

    fn related(&self, track_id: &str) -> Result<Vec<String>> {
        Ok(self
            .related
            .lock()
            .unwrap()
            .get(track_id)
            .cloned()
            .unwrap_or_default())
    }

    fn search(&self, query: &str) -> Result<Vec<Track>> {
        self.searches
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or_else(|| Error::Resolution(format!("no results for '{}'", query)))
    }
}

/// Scripted sink: records every play and either auto-completes after a
/// delay or waits for the test to drive the completion by hand.
pub struct FakeSink {
    /// (track id, volume) per play, in order
    plays: Mutex<Vec<(String, f32)>>,
    pending: Arc<Mutex<Option<Completion>>>,
    auto_complete_after: Option<Duration>,
    volumes: Mutex<Vec<f32>>,
    pauses: Mutex<u32>,
    resumes: Mutex<u32>,
    disconnects: Mutex<u32>,
}

impl FakeSink {
    /// Every play completes successfully after `delay`
    pub fn auto(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            plays: Mutex::new(Vec::new()),
            pending: Arc::new(Mutex::new(None)),
            auto_complete_after: Some(delay),
            volumes: Mutex::new(Vec::new()),
            pauses: Mutex::new(0),
            resumes: Mutex::new(0),
            disconnects: Mutex::new(0),
        })
    }

    /// Plays stay pending until the test finishes or fails them
    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            plays: Mutex::new(Vec::new()),
            pending: Arc::new(Mutex::new(None)),
            auto_complete_after: None,
            volumes: Mutex::new(Vec::new()),
            pauses: Mutex::new(0),
            resumes: Mutex::new(0),
            disconnects: Mutex::new(0),
        })
    }

    pub fn plays(&self) -> Vec<(String, f32)> {
        self.plays.lock().unwrap().clone()
    }

    pub fn played_ids(&self) -> Vec<String> {
        self.plays().into_iter().map(|(id, _)| id).collect()
    }

    /// Take the pending completion to drive it by hand (manual mode)
    pub fn take_completion(&self) -> Option<Completion> {
        self.pending.lock().unwrap().take()
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.volumes.lock().unwrap().clone()
    }

    pub fn pause_count(&self) -> u32 {
        *self.pauses.lock().unwrap()
    }

    pub fn resume_count(&self) -> u32 {
        *self.resumes.lock().unwrap()
    }

    pub fn disconnect_count(&self) -> u32 {
        *self.disconnects.lock().unwrap()
    }
}

impl PlaybackSink for FakeSink {
    fn play(&self, track: &Track, volume: f32, done: Completion) -> Result<()> {
        self.plays.lock().unwrap().push((track.id.clone(), volume));
        *self.pending.lock().unwrap() = Some(done);

        if let Some(delay) = self.auto_complete_after {
            let pending = Arc::clone(&self.pending);
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                // Only complete if stop has not already claimed it
                if let Some(done) = pending.lock().unwrap().take() {
                    done.finish();
                }
            });
        }
        Ok(())
    }

    fn stop(&self) {
        if let Some(done) = self.pending.lock().unwrap().take() {
            done.finish();
        }
    }

    fn set_volume(&self, volume: f32) {
        self.volumes.lock().unwrap().push(volume);
    }

    fn pause(&self) {
        *self.pauses.lock().unwrap() += 1;
    }

    fn resume(&self) {
        *self.resumes.lock().unwrap() += 1;
    }

    fn disconnect(&self) {
        self.stop();
        *self.disconnects.lock().unwrap() += 1;
    }
}

/// Wait for a condition with a hard cap, polling at millisecond grain
pub async fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for {}", what);
}
