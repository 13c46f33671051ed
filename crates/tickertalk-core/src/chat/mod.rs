//! Per-session conversation state.
//!
//! A `Conversation` owns the ordered turns of one live session and the
//! chat-completion client used to stream summaries for it.

pub mod conversation;
pub mod stream;
