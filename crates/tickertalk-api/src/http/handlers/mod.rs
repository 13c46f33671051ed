//! HTTP and WebSocket request handlers.

pub mod knowledge;
pub mod session;
pub mod starters;
pub mod ws;
