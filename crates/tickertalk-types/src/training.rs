//! Setup-time training records loaded into the retrieval store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::knowledge::QuestionSql;

/// One entry of a training file.
///
/// Training files are a list of these, in JSON or YAML. The shape of each
/// entry decides its kind:
///
/// ```yaml
/// - question: What is the highest ever stock price for Illumina?
///   sql: SELECT MAX(high) FROM stock_prices WHERE ticker = 'ILMN';
/// - ddl: CREATE TABLE stock_prices (...);
/// - documentation: Prices are in USD and adjusted for splits.
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrainingRecord {
    QuestionSql { question: String, sql: String },
    Ddl { ddl: String },
    Documentation { documentation: String },
}

impl TrainingRecord {
    pub fn kind(&self) -> TrainingKind {
        match self {
            TrainingRecord::QuestionSql { .. } => TrainingKind::QuestionSql,
            TrainingRecord::Ddl { .. } => TrainingKind::Ddl,
            TrainingRecord::Documentation { .. } => TrainingKind::Documentation,
        }
    }

    /// Text that is embedded for similarity search.
    pub fn embedding_text(&self) -> &str {
        match self {
            TrainingRecord::QuestionSql { question, .. } => question,
            TrainingRecord::Ddl { ddl } => ddl,
            TrainingRecord::Documentation { documentation } => documentation,
        }
    }
}

impl From<QuestionSql> for TrainingRecord {
    fn from(pair: QuestionSql) -> Self {
        TrainingRecord::QuestionSql {
            question: pair.question,
            sql: pair.sql,
        }
    }
}

/// Category of a training record (and of a retrieval-store table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingKind {
    QuestionSql,
    Ddl,
    Documentation,
}

impl TrainingKind {
    /// Suffix appended to deterministic content ids.
    pub fn id_suffix(&self) -> &'static str {
        match self {
            TrainingKind::QuestionSql => "-sql",
            TrainingKind::Ddl => "-ddl",
            TrainingKind::Documentation => "-doc",
        }
    }
}

impl fmt::Display for TrainingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingKind::QuestionSql => write!(f, "question_sql"),
            TrainingKind::Ddl => write!(f, "ddl"),
            TrainingKind::Documentation => write!(f, "documentation"),
        }
    }
}

/// Number of records trained per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub question_sql: usize,
    pub ddl: usize,
    pub documentation: usize,
}

impl TrainingSummary {
    pub fn record(&mut self, kind: TrainingKind) {
        match kind {
            TrainingKind::QuestionSql => self.question_sql += 1,
            TrainingKind::Ddl => self.ddl += 1,
            TrainingKind::Documentation => self.documentation += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.question_sql + self.ddl + self.documentation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_shapes() {
        let records: Vec<TrainingRecord> = serde_json::from_str(
            r#"[
                {"question": "Highest Illumina price?", "sql": "SELECT MAX(high) FROM stock_prices;"},
                {"ddl": "CREATE TABLE stock_prices (ticker TEXT)"},
                {"documentation": "Prices are in USD."}
            ]"#,
        )
        .unwrap();
        let kinds: Vec<TrainingKind> = records.iter().map(TrainingRecord::kind).collect();
        assert_eq!(
            kinds,
            vec![
                TrainingKind::QuestionSql,
                TrainingKind::Ddl,
                TrainingKind::Documentation
            ]
        );
        assert_eq!(records[0].embedding_text(), "Highest Illumina price?");
    }

    #[test]
    fn test_yaml_shapes() {
        let yaml = "- question: q\n  sql: SELECT 1;\n- documentation: notes\n";
        let records: Vec<TrainingRecord> = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind(), TrainingKind::Documentation);
    }

    #[test]
    fn test_question_without_sql_is_rejected() {
        let result: Result<TrainingRecord, _> = serde_json::from_str(r#"{"question": "q"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = TrainingSummary::default();
        summary.record(TrainingKind::Ddl);
        summary.record(TrainingKind::QuestionSql);
        summary.record(TrainingKind::QuestionSql);
        assert_eq!(summary.question_sql, 2);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_id_suffixes() {
        assert_eq!(TrainingKind::QuestionSql.id_suffix(), "-sql");
        assert_eq!(TrainingKind::Ddl.id_suffix(), "-ddl");
        assert_eq!(TrainingKind::Documentation.id_suffix(), "-doc");
    }
}
