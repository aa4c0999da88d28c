//! Media resolution
//!
//! The resolver is an external collaborator with a blocking contract:
//! implementations may block the calling thread (process spawn, network),
//! so the session loop offloads every call through `spawn_blocking` and
//! never stalls other sessions on it.

use crate::error::{Error, Result};
use jukebot_common::Track;
use serde_json::Value;
use std::process::Command;
use tracing::debug;

/// Track metadata lookup for raw requests and autoplay candidates
pub trait MediaResolver: Send + Sync {
    /// Resolve a free-text query or URL to the single best matching track.
    fn resolve(&self, query: &str) -> Result<Track>;

    /// Fully resolve a previously returned candidate id to a track.
    ///
    /// Default implementation treats the id as a plain query; resolvers
    /// with a canonical URL scheme override this.
    fn resolve_id(&self, track_id: &str) -> Result<Track> {
        self.resolve(track_id)
    }

    /// Fetch candidate ids related to a previously resolved track.
    fn related(&self, track_id: &str) -> Result<Vec<String>>;

    /// Resolve a free-text query to every matching track, not just the
    /// best one. Used where the caller wants to pick among candidates
    /// (autoplay fallback).
    fn search(&self, query: &str) -> Result<Vec<Track>>;
}

/// Resolver backed by the yt-dlp command-line extractor
///
/// Mirrors the extractor options of the original bot: best single match,
/// no playlists, free text falls back to a search.
/// How many results a multi-match search asks the extractor for
const SEARCH_LIMIT: usize = 5;

pub struct YtDlpResolver {
    program: String,
}

impl YtDlpResolver {
    pub fn new() -> Self {
        Self::with_program("yt-dlp")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run the extractor and parse its JSON document
    fn extract(&self, target: &str) -> Result<Value> {
        debug!("Running {} for: {}", self.program, target);

        let output = Command::new(&self.program)
            .args([
                "-J",
                "--no-playlist",
                "--no-warnings",
                "--quiet",
                "--default-search",
                "ytsearch",
            ])
            .arg(target)
            .output()
            .map_err(|e| Error::Resolution(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Resolution(format!(
                "{} failed for '{}': {}",
                self.program,
                target,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::Resolution(format!("unreadable extractor output: {}", e)))
    }

    /// Canonical watch URL for a candidate id
    fn watch_url(track_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", track_id)
    }

    /// Build a Track from one extractor entry
    fn track_from_entry(entry: &Value) -> Result<Track> {
        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Resolution("extractor entry missing id".to_string()))?;

        let stream_url = entry
            .get("url")
            .or_else(|| entry.get("webpage_url"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Resolution("extractor entry missing stream url".to_string()))?;

        let title = entry
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Unknown title");

        Ok(Track {
            id: id.to_string(),
            title: title.to_string(),
            stream_url: stream_url.to_string(),
            thumbnail: entry
                .get("thumbnail")
                .and_then(Value::as_str)
                .map(String::from),
            uploader: entry
                .get("uploader")
                .and_then(Value::as_str)
                .map(String::from),
        })
    }

    /// Pick the entry to use from a resolver document: search results
    /// arrive as a playlist wrapper, direct URLs as a bare entry.
    fn best_entry(data: &Value) -> Result<&Value> {
        match data.get("entries").and_then(Value::as_array) {
            Some(entries) => entries
                .first()
                .ok_or_else(|| Error::Resolution("no results".to_string())),
            None => Ok(data),
        }
    }

    /// Every usable track in a resolver document. Entries the extractor
    /// returned incomplete are skipped rather than failing the whole batch.
    fn tracks_from_document(data: &Value) -> Result<Vec<Track>> {
        match data.get("entries").and_then(Value::as_array) {
            Some(entries) => Ok(entries
                .iter()
                .filter_map(|entry| Self::track_from_entry(entry).ok())
                .collect()),
            None => Ok(vec![Self::track_from_entry(data)?]),
        }
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaResolver for YtDlpResolver {
    fn resolve(&self, query: &str) -> Result<Track> {
        let data = self.extract(query)?;
        let entry = Self::best_entry(&data)
            .map_err(|_| Error::Resolution(format!("no results for '{}'", query)))?;
        Self::track_from_entry(entry)
    }

    fn resolve_id(&self, track_id: &str) -> Result<Track> {
        self.resolve(&Self::watch_url(track_id))
    }

    fn related(&self, track_id: &str) -> Result<Vec<String>> {
        let data = self.extract(&Self::watch_url(track_id))?;

        // The extractor omits the field entirely when it has no
        // suggestions; treat that as an empty candidate list.
        let related = data
            .get("related_videos")
            .and_then(Value::as_array)
            .map(|videos| {
                videos
                    .iter()
                    .filter_map(|v| v.get("id").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(related)
    }

    fn search(&self, query: &str) -> Result<Vec<Track>> {
        // Explicit search prefix with a result count; the per-call prefix
        // overrides the single-result default-search.
        let data = self.extract(&format!("ytsearch{}:{}", SEARCH_LIMIT, query))?;
        Self::tracks_from_document(&data)
    }
}
