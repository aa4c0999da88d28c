//! Per-session track queue
//!
//! FIFO buffer shared between command handlers (producers) and exactly one
//! session loop (consumer). Items are either pre-resolved tracks (autoplay,
//! play-now) or raw request strings resolved by the loop. The clear epoch
//! lets the loop detect that a stop/play-now raced an in-flight resolution
//! and discard the late result instead of playing it.

use jukebot_common::Track;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

/// A pending playback request
#[derive(Debug, Clone)]
pub enum QueueItem {
    /// Already resolved, plays as-is
    Resolved(Track),
    /// Raw search string or URL, resolved by the session loop
    Query(String),
}

impl QueueItem {
    /// Display label for queue listings
    pub fn title(&self) -> &str {
        match self {
            QueueItem::Resolved(track) => &track.title,
            QueueItem::Query(query) => query,
        }
    }

    /// Stream locator, when already known
    pub fn url(&self) -> Option<&str> {
        match self {
            QueueItem::Resolved(track) => Some(&track.stream_url),
            QueueItem::Query(_) => None,
        }
    }
}

/// Unbounded FIFO with a blocking-with-timeout dequeue
#[derive(Default)]
pub struct TrackQueue {
    items: Mutex<VecDeque<QueueItem>>,
    notify: Notify,
    epoch: AtomicU64,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request. Never blocks, never fails.
    pub fn push(&self, item: QueueItem) {
        self.items.lock().unwrap().push_back(item);
        self.notify.notify_one();
    }

    /// Atomically discard everything pending and insert `item` at the
    /// front. This is the only queue-reordering operation (play-now).
    pub fn replace(&self, item: QueueItem) {
        {
            let mut items = self.items.lock().unwrap();
            items.clear();
            items.push_back(item);
            self.epoch.fetch_add(1, Ordering::SeqCst);
        }
        self.notify.notify_one();
    }

    /// Discard all pending items. An item already dequeued is unaffected.
    pub fn clear(&self) {
        let mut items = self.items.lock().unwrap();
        items.clear();
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Read-only snapshot of the pending items, in playback order
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.items.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    /// Clear-generation counter, bumped by `clear` and `replace`.
    ///
    /// A consumer that captured the epoch before starting a slow operation
    /// can tell afterwards whether the queue it was working for was wiped.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Remove and return the oldest item, waiting up to `timeout` for one
    /// to arrive. `None` means the timeout elapsed with nothing queued.
    ///
    /// At most one dequeue observes a given element: removal happens under
    /// the queue lock.
    pub async fn pop(&self, timeout: Duration) -> Option<QueueItem> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register for wakeup before checking, so a push between the
            // check and the await cannot be missed.
            let notified = self.notify.notified();

            if let Some(item) = self.items.lock().unwrap().pop_front() {
                return Some(item);
            }

            if timeout_at(deadline, notified).await.is_err() {
                // Final check: a push may have landed exactly at the deadline
                return self.items.lock().unwrap().pop_front();
            }
        }
    }
}
