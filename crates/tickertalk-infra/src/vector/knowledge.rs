//! LanceDB-backed knowledge store.
//!
//! Implements `KnowledgeStore` from `tickertalk-core` with three tables:
//! `question_sql`, `ddl` and `documentation`. Rows are keyed by the
//! deterministic content id, so re-adding identical content is skipped.

use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::debug;

use tickertalk_core::knowledge::store::KnowledgeStore;
use tickertalk_types::error::RepositoryError;
use tickertalk_types::knowledge::{KnowledgeCounts, QuestionSql};

use super::lance::LanceVectorStore;
use super::schema::{
    DDL_TABLE, DOCUMENTATION_TABLE, EMBEDDING_DIMENSION, QUESTION_SQL_TABLE, question_sql_schema,
    text_schema,
};

const TABLES: [&str; 3] = [QUESTION_SQL_TABLE, DDL_TABLE, DOCUMENTATION_TABLE];

pub struct LanceKnowledgeStore {
    store: LanceVectorStore,
}

impl LanceKnowledgeStore {
    pub fn new(store: LanceVectorStore) -> Self {
        Self { store }
    }

    /// Drop every knowledge table. The next write recreates them empty.
    pub async fn reset(&self) -> Result<(), RepositoryError> {
        for table in TABLES {
            self.store
                .drop_table(table)
                .await
                .map_err(|e| RepositoryError::Query(format!("Failed to drop {table}: {e}")))?;
        }
        Ok(())
    }

    async fn table(&self, name: &str) -> Result<lancedb::Table, RepositoryError> {
        let schema = if name == QUESTION_SQL_TABLE {
            question_sql_schema()
        } else {
            text_schema()
        };
        self.store
            .ensure_table(name, Arc::new(schema))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to open table {name}: {e}")))
    }

    /// Insert a row unless one with the same id already exists.
    async fn upsert(&self, name: &str, id: &str, batch: RecordBatch) -> Result<(), RepositoryError> {
        let table = self.table(name).await?;

        let existing = table
            .count_rows(Some(format!("id = '{id}'")))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to look up {id}: {e}")))?;
        if existing > 0 {
            debug!(table = name, id, "Entry already stored");
            return Ok(());
        }

        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to add to {name}: {e}")))?;
        Ok(())
    }

    /// Nearest rows by cosine distance, closest first.
    async fn search(
        &self,
        name: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RecordBatch>, RepositoryError> {
        if limit == 0 || !self.store.table_exists(name).await {
            return Ok(Vec::new());
        }
        let table = self.table(name).await?;
        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to count {name}: {e}")))?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let results = table
            .vector_search(embedding)
            .map_err(|e| RepositoryError::Query(format!("Vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Vector search failed: {e}")))?;

        results
            .try_collect()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to collect results: {e}")))
    }

    async fn search_text(
        &self,
        name: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<String>, RepositoryError> {
        let batches = self.search(name, embedding, limit).await?;
        let mut texts = Vec::new();
        for batch in &batches {
            let content = string_column(batch, "content")?;
            texts.extend((0..content.len()).map(|i| content.value(i).to_string()));
        }
        Ok(texts)
    }

    async fn count(&self, name: &str) -> Result<usize, RepositoryError> {
        if !self.store.table_exists(name).await {
            return Ok(0);
        }
        self.table(name)
            .await?
            .count_rows(None)
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to count {name}: {e}")))
    }
}

fn vector_array(embedding: &[f32]) -> Result<FixedSizeListArray, RepositoryError> {
    if embedding.len() != EMBEDDING_DIMENSION as usize {
        return Err(RepositoryError::Query(format!(
            "Expected {EMBEDDING_DIMENSION}-dimensional embedding, got {}",
            embedding.len()
        )));
    }
    let values = Float32Array::from(embedding.to_vec());
    let field = Arc::new(Field::new("item", DataType::Float32, true));
    FixedSizeListArray::try_new(field, EMBEDDING_DIMENSION, Arc::new(values), None)
        .map_err(|e| RepositoryError::Query(format!("Failed to build vector column: {e}")))
}

fn build_batch(schema: Schema, columns: Vec<Arc<dyn Array>>) -> Result<RecordBatch, RepositoryError> {
    RecordBatch::try_new(Arc::new(schema), columns)
        .map_err(|e| RepositoryError::Query(format!("Failed to build record batch: {e}")))
}

fn text_batch(id: &str, content: &str, embedding: &[f32]) -> Result<RecordBatch, RepositoryError> {
    build_batch(
        text_schema(),
        vec![
            Arc::new(StringArray::from(vec![id.to_string()])),
            Arc::new(StringArray::from(vec![content.to_string()])),
            Arc::new(vector_array(embedding)?),
        ],
    )
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, RepositoryError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| RepositoryError::Query(format!("Missing string column {name}")))
}

impl KnowledgeStore for LanceKnowledgeStore {
    async fn add_question_sql(
        &self,
        id: &str,
        pair: &QuestionSql,
        embedding: &[f32],
    ) -> Result<(), RepositoryError> {
        let batch = build_batch(
            question_sql_schema(),
            vec![
                Arc::new(StringArray::from(vec![id.to_string()])),
                Arc::new(StringArray::from(vec![pair.question.clone()])),
                Arc::new(StringArray::from(vec![pair.sql.clone()])),
                Arc::new(vector_array(embedding)?),
            ],
        )?;
        self.upsert(QUESTION_SQL_TABLE, id, batch).await
    }

    async fn add_ddl(&self, id: &str, ddl: &str, embedding: &[f32]) -> Result<(), RepositoryError> {
        self.upsert(DDL_TABLE, id, text_batch(id, ddl, embedding)?).await
    }

    async fn add_documentation(
        &self,
        id: &str,
        documentation: &str,
        embedding: &[f32],
    ) -> Result<(), RepositoryError> {
        self.upsert(
            DOCUMENTATION_TABLE,
            id,
            text_batch(id, documentation, embedding)?,
        )
        .await
    }

    async fn similar_question_sql(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<QuestionSql>, RepositoryError> {
        let batches = self.search(QUESTION_SQL_TABLE, embedding, limit).await?;
        let mut pairs = Vec::new();
        for batch in &batches {
            let questions = string_column(batch, "question")?;
            let sqls = string_column(batch, "sql")?;
            pairs.extend((0..batch.num_rows()).map(|i| QuestionSql {
                question: questions.value(i).to_string(),
                sql: sqls.value(i).to_string(),
            }));
        }
        Ok(pairs)
    }

    async fn related_ddl(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<String>, RepositoryError> {
        self.search_text(DDL_TABLE, embedding, limit).await
    }

    async fn related_documentation(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<String>, RepositoryError> {
        self.search_text(DOCUMENTATION_TABLE, embedding, limit).await
    }

    async fn counts(&self) -> Result<KnowledgeCounts, RepositoryError> {
        Ok(KnowledgeCounts {
            question_sql: self.count(QUESTION_SQL_TABLE).await?,
            ddl: self.count(DDL_TABLE).await?,
            documentation: self.count(DOCUMENTATION_TABLE).await?,
        })
    }
}
