//! Playback core: queue, history, autoplay lookup, and the session loop

pub mod autoplay;
pub mod history;
pub mod queue;
pub mod session;

pub use history::PlayHistory;
pub use queue::{QueueItem, TrackQueue};
pub use session::{LoopExit, PlayerSettings, PlayerState, SessionPlayer};
