//! HTTP and WebSocket layer for TickerTalk.
//!
//! Read-only JSON endpoints under `/api/v1/` using the envelope response
//! format, plus the chat WebSocket at `/ws/chat`.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
