//! Infrastructure layer for TickerTalk.
//!
//! Contains implementations of the port traits defined in `tickertalk-core`:
//! the Azure OpenAI chat-completion provider, the read-only SQLite executor,
//! the LanceDB knowledge store with its local embedder, and configuration
//! loading.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod vector;
