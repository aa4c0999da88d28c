//! Autoplay candidate lookup
//!
//! When the queue drains with autoplay enabled, the session loop derives
//! one candidate from the most recently played track: related items first,
//! then a fixed fallback search, both filtered against the play history.
//! Blocking (it calls the resolver); callers offload it like any other
//! resolution.

use crate::playback::history::PlayHistory;
use crate::resolver::MediaResolver;
use jukebot_common::Track;
use rand::seq::SliceRandom;
use tracing::debug;

/// Derive the next track to self-feed the queue, or `None` when neither
/// related items nor the fallback search produce an unplayed candidate.
///
/// A candidate that is picked but fails to resolve ends the cycle without
/// falling through to the fallback search; the next empty-queue completion
/// simply tries again.
pub fn next_candidate(
    resolver: &dyn MediaResolver,
    history: &PlayHistory,
    fallback_query: &str,
) -> Option<Track> {
    let last_played = history.last()?;
    let mut rng = rand::thread_rng();

    match resolver.related(last_played) {
        Ok(related) => {
            let fresh: Vec<&String> = related
                .iter()
                .filter(|id| !history.contains(id))
                .collect();

            if let Some(id) = fresh.choose(&mut rng) {
                return match resolver.resolve_id(id) {
                    Ok(track) => Some(track),
                    Err(e) => {
                        debug!("autoplay candidate '{}' failed to resolve: {}", id, e);
                        None
                    }
                };
            }
            debug!("no unplayed related items for '{}'", last_played);
        }
        Err(e) => debug!("related lookup for '{}' failed: {}", last_played, e),
    }

    // Fallback: generic search, every result filtered the same way, then
    // a uniform pick among the survivors
    match resolver.search(fallback_query) {
        Ok(results) => {
            let fresh: Vec<&Track> = results
                .iter()
                .filter(|track| !history.contains(&track.id))
                .collect();
            match fresh.choose(&mut rng) {
                Some(track) => Some((*track).clone()),
                None => {
                    debug!("fallback search '{}' has no unplayed results", fallback_query);
                    None
                }
            }
        }
        Err(e) => {
            debug!("fallback search '{}' failed: {}", fallback_query, e);
            None
        }
    }
}
