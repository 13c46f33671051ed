//! Retrieval-store trait.
//!
//! Three tables of embedded entries: example question/SQL pairs, DDL
//! statements, and free-text documentation. Implementations (e.g., LanceDB)
//! live in tickertalk-infra.

use tickertalk_types::error::RepositoryError;
use tickertalk_types::knowledge::{KnowledgeCounts, QuestionSql};

/// Vector-indexed storage for SQL-generation context.
///
/// Adds are upserts keyed by `id`, so re-adding identical content is a no-op.
pub trait KnowledgeStore: Send + Sync {
    fn add_question_sql(
        &self,
        id: &str,
        pair: &QuestionSql,
        embedding: &[f32],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn add_ddl(
        &self,
        id: &str,
        ddl: &str,
        embedding: &[f32],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn add_documentation(
        &self,
        id: &str,
        documentation: &str,
        embedding: &[f32],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Example pairs whose question is nearest the query, closest first.
    fn similar_question_sql(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<QuestionSql>, RepositoryError>> + Send;

    fn related_ddl(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    fn related_documentation(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    fn counts(
        &self,
    ) -> impl std::future::Future<Output = Result<KnowledgeCounts, RepositoryError>> + Send;
}
