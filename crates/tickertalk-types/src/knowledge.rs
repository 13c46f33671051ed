//! Retrieval-store entry and context types.

use serde::{Deserialize, Serialize};

/// A stored example question with the SQL that answers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSql {
    pub question: String,
    pub sql: String,
}

/// Everything retrieved for one question, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub question_sql: Vec<QuestionSql>,
    pub ddl: Vec<String>,
    pub documentation: Vec<String>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.question_sql.is_empty() && self.ddl.is_empty() && self.documentation.is_empty()
    }
}

/// Number of entries held per retrieval-store table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeCounts {
    pub question_sql: usize,
    pub ddl: usize,
    pub documentation: usize,
}
