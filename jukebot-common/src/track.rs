//! Resolved media track model

use serde::{Deserialize, Serialize};

/// A resolved, playable media item.
///
/// Immutable once resolved: the media resolver fills every field from the
/// extractor's metadata and nothing mutates the track afterwards. The
/// playback sink only ever borrows it for the duration of one play.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Opaque id minted by the media resolver (e.g. a video id)
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Playable stream locator handed to the playback sink
    pub stream_url: String,

    /// Thumbnail image URL, when the resolver provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Uploader / channel name, when the resolver provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
}
