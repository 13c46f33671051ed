//! Business logic and port trait definitions for TickerTalk.
//!
//! This crate defines the "ports" (provider, store, embedder, executor
//! traits) that the infrastructure layer implements, plus the pure logic
//! between them: prompting, SQL extraction, chart building, the
//! conversation manager and the pipeline orchestrator. It depends only on
//! `tickertalk-types` -- never on `tickertalk-infra` or any database/IO crate.

pub mod assistant;
pub mod chart;
pub mod chat;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod sql;
pub mod training;
