//! Retrieval store for SQL-generation context.
//!
//! - `Embedder` / `BoxEmbedder`: text-to-vector port
//! - `KnowledgeStore`: vector-indexed storage port
//! - `KnowledgeBase`: the process-wide service that embeds and stores
//!   training records and retrieves context for new questions

pub mod base;
pub mod box_embedder;
pub mod embedder;
pub mod store;

#[cfg(test)]
pub(crate) mod fake;

use sha2::{Digest, Sha256};

use tickertalk_types::training::TrainingRecord;

/// Content-derived id for a training record: lowercase hex SHA-256 of the
/// record content plus a per-kind suffix. Training the same record twice
/// yields the same id.
pub fn deterministic_id(record: &TrainingRecord) -> String {
    let content = match record {
        TrainingRecord::QuestionSql { question, sql } => format!("question: {question}\nsql: {sql}"),
        TrainingRecord::Ddl { ddl } => ddl.clone(),
        TrainingRecord::Documentation { documentation } => documentation.clone(),
    };
    let digest = Sha256::digest(content.as_bytes());
    format!("{:x}{}", digest, record.kind().id_suffix())
}
