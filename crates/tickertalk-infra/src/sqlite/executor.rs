//! Read-only SQL execution against the stock database.
//!
//! Rows are decoded by their runtime storage class rather than a fixed
//! struct, since the query shape is only known after generation.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::debug;

use tickertalk_core::sql::SqlExecutor;
use tickertalk_types::error::PipelineError;
use tickertalk_types::query::QueryResult;

/// Executes generated SQL on a read-only connection pool.
#[derive(Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Open the database at `path` read-only. Fails if the file is missing.
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::info!(path = %path.display(), "Opened stock database (read-only)");
        Ok(Self { pool })
    }

    /// CREATE statements for every user table and view, for schema training.
    pub async fn schema_ddl(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT sql FROM sqlite_master \
             WHERE type IN ('table', 'view') AND sql IS NOT NULL AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(sql,)| sql).collect())
    }

    async fn column_names(&self, sql: &str) -> Result<Vec<String>, sqlx::Error> {
        let statement = (&self.pool).prepare(sql).await?;
        Ok(statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }
}

impl SqlExecutor for SqliteExecutor {
    fn dialect(&self) -> &str {
        "SQLite"
    }

    async fn run_sql(&self, sql: &str) -> Result<QueryResult, PipelineError> {
        let execution = |e: sqlx::Error| PipelineError::Execution(e.to_string());

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(execution)?;

        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => self.column_names(sql).await.map_err(execution)?,
        };

        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(execution)?;

        debug!(columns = columns.len(), rows = rows.len(), "SQL executed");
        Ok(QueryResult::new(columns, rows))
    }
}

fn decode_row(row: &SqliteRow) -> Result<Vec<Value>, sqlx::Error> {
    (0..row.len()).map(|i| decode_cell(row, i)).collect()
}

/// Decode one cell by its storage class: INTEGER, REAL, TEXT, BLOB or NULL.
fn decode_cell(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();

    let value = match storage.as_str() {
        "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => serde_json::Number::from_f64(row.try_get_unchecked::<f64, _>(index)?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => Value::String(hex(&row.try_get_unchecked::<Vec<u8>, _>(index)?)),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
