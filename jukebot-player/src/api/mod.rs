//! HTTP API for session control and event streaming

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, AppContext, SinkFactory};
