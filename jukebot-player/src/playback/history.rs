//! Bounded play history
//!
//! Most-recent-last record of played track ids, used only to keep autoplay
//! from repeating recent tracks. Not durable; dies with the session.

use std::collections::VecDeque;

/// Default history cap (tracks remembered per session)
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct PlayHistory {
    ids: VecDeque<String>,
    limit: usize,
}

impl PlayHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(limit.min(HISTORY_LIMIT)),
            limit,
        }
    }

    /// Record a played track id, evicting the oldest past the cap
    pub fn push(&mut self, id: impl Into<String>) {
        self.ids.push_back(id.into());
        while self.ids.len() > self.limit {
            self.ids.pop_front();
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|known| known == id)
    }

    /// Most recently played id
    pub fn last(&self) -> Option<&str> {
        self.ids.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for PlayHistory {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}
