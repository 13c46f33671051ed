//! Tabular query results returned by the SQL executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Ordered columns and ordered rows produced by one SQL execution.
///
/// Cells are JSON values so the table can be rendered, charted, and sent
/// over the wire without a second conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Coarse column classification used by chart building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exactly one row with exactly one column.
    pub fn is_single_value(&self) -> bool {
        self.columns.len() == 1 && self.rows.len() == 1
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of one column, in row order. Short rows yield `Null`.
    pub fn column_values(&self, index: usize) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Classify every column. A column is numeric when it has at least one
    /// non-null value and every non-null value is a JSON number.
    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.columns.len())
            .map(|i| {
                let mut seen = false;
                let all_numeric = self.rows.iter().all(|row| match row.get(i) {
                    None | Some(Value::Null) => true,
                    Some(Value::Number(_)) => {
                        seen = true;
                        true
                    }
                    Some(_) => false,
                });
                if all_numeric && seen {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Categorical
                }
            })
            .collect()
    }

    /// Number of distinct non-null values in a column.
    pub fn distinct_count(&self, index: usize) -> usize {
        self.rows
            .iter()
            .filter_map(|row| row.get(index))
            .filter(|v| !v.is_null())
            .map(cell_text)
            .collect::<HashSet<_>>()
            .len()
    }

    /// `name: kind` per line, used as result metadata in prompts.
    pub fn dtypes(&self) -> String {
        self.columns
            .iter()
            .zip(self.column_kinds())
            .map(|(name, kind)| format!("{name}: {kind}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the first `limit` rows as a GitHub-style markdown table.
    pub fn to_markdown(&self, limit: usize) -> String {
        if self.columns.is_empty() {
            return "(no columns)".to_string();
        }

        let mut out = String::new();
        out.push_str("| ");
        out.push_str(
            &self
                .columns
                .iter()
                .map(|c| escape_pipe(c))
                .collect::<Vec<_>>()
                .join(" | "),
        );
        out.push_str(" |\n|");
        for _ in &self.columns {
            out.push_str(":---|");
        }

        for row in self.rows.iter().take(limit) {
            out.push_str("\n| ");
            let cells: Vec<String> = (0..self.columns.len())
                .map(|i| escape_pipe(&row.get(i).map(cell_text).unwrap_or_default()))
                .collect();
            out.push_str(&cells.join(" | "));
            out.push_str(" |");
        }
        out
    }
}

/// Display text for a single cell. Strings are unquoted, nulls are empty.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_pipe(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
