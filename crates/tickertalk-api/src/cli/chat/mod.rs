//! Interactive terminal chat for TickerTalk.
//!
//! One `Conversation` lives for the whole loop. Questions stream their
//! summary under a spinner; numbered follow-ups can be picked by typing
//! their number. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
