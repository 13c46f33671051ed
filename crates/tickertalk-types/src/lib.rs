//! Shared domain types for TickerTalk.
//!
//! This crate contains the domain types used across the TickerTalk workspace:
//! conversation turns, query results, chart descriptions, training records,
//! pipeline replies and events, configuration, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, schemars.

pub mod chart;
pub mod chat;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod query;
pub mod reply;
pub mod starter;
pub mod training;
