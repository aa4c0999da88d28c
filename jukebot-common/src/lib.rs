//! # Jukebot Common Library
//!
//! Shared code for the jukebot service crates:
//! - Track model (resolved media items)
//! - Event types (SessionEvent enum) and the EventBus broadcaster

pub mod events;
pub mod track;

pub use events::{DestroyReason, EventBus, SessionEvent};
pub use track::Track;
