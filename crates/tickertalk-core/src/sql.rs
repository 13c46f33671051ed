//! SQL executor port.
//!
//! Implementations (e.g., the read-only SQLite executor) live in
//! tickertalk-infra.

use tickertalk_types::error::PipelineError;
use tickertalk_types::query::QueryResult;

/// Runs generated SQL against the stock database.
pub trait SqlExecutor: Send + Sync {
    /// SQL dialect name used in prompts (e.g., "SQLite").
    fn dialect(&self) -> &str;

    /// Execute one statement. Database rejections map to
    /// [`PipelineError::Execution`].
    fn run_sql(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<QueryResult, PipelineError>> + Send;
}
