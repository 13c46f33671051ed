//! Vector database infrastructure for the knowledge store.
//!
//! Provides LanceDB vector store management and fastembed-based local
//! embedding generation. Arrow schemas define the table structures.

pub mod embedder;
pub mod knowledge;
pub mod lance;
pub mod schema;
