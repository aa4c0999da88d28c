//! # Jukebot Player Library (jukebot-player)
//!
//! Per-session playback scheduling for voice-enabled group chats.
//!
//! **Purpose:** Own one playback queue, history, and scheduling loop per
//! session, resolve raw requests through an external media resolver, hand
//! resolved tracks to an external playback sink, and provide an HTTP/SSE
//! control interface.
//!
//! **Architecture:** One cooperative tokio task per session, created and
//! evicted by the `SessionRegistry`; blocking resolver calls are offloaded
//! so session loops never stall each other.

pub mod api;
pub mod config;
pub mod error;
pub mod playback;
pub mod registry;
pub mod resolver;
pub mod sink;

pub use error::{Error, Result};
pub use registry::SessionRegistry;
