//! Arrow schema definitions for the LanceDB knowledge tables.
//!
//! Each schema includes a 384-dimensional float32 vector field for
//! BGESmallENV15 embeddings.
//!
//! Arrow versions MUST match lancedb's transitive dependency (57.3 for lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

/// BGESmallENV15 embedding dimension.
pub const EMBEDDING_DIMENSION: i32 = 384;

pub const QUESTION_SQL_TABLE: &str = "question_sql";
pub const DDL_TABLE: &str = "ddl";
pub const DOCUMENTATION_TABLE: &str = "documentation";

fn vector_field() -> Field {
    Field::new(
        "vector",
        DataType::FixedSizeList(
            Arc::new(Field::new("item", DataType::Float32, true)),
            EMBEDDING_DIMENSION,
        ),
        false,
    )
}

/// Example question/SQL pairs, embedded by question.
pub fn question_sql_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("question", DataType::Utf8, false),
        Field::new("sql", DataType::Utf8, false),
        vector_field(),
    ])
}

/// Single-text tables (`ddl`, `documentation`) with the text in `content`.
pub fn text_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        vector_field(),
    ])
}
