//! KnowledgeBase service: the retrieval half of the SQL translator.
//!
//! One instance is built at startup and shared across sessions behind an
//! `Arc`. Reads run concurrently; writes are serialized by an internal guard
//! because the underlying store makes no concurrent-write promises.

use tokio::sync::Mutex;
use tracing::{debug, info};

use tickertalk_types::error::RepositoryError;
use tickertalk_types::knowledge::{KnowledgeCounts, QuestionSql, RetrievedContext};
use tickertalk_types::training::TrainingRecord;

use super::box_embedder::BoxEmbedder;
use super::deterministic_id;
use super::store::KnowledgeStore;

/// Default number of results retrieved per category.
pub const DEFAULT_RESULTS_PER_CATEGORY: usize = 10;

pub struct KnowledgeBase<S: KnowledgeStore> {
    embedder: BoxEmbedder,
    store: S,
    results_per_category: usize,
    write_guard: Mutex<()>,
}

impl<S: KnowledgeStore> KnowledgeBase<S> {
    pub fn new(embedder: BoxEmbedder, store: S) -> Self {
        Self {
            embedder,
            store,
            results_per_category: DEFAULT_RESULTS_PER_CATEGORY,
            write_guard: Mutex::new(()),
        }
    }

    pub fn with_results_per_category(mut self, n: usize) -> Self {
        self.results_per_category = n;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn embedder(&self) -> &BoxEmbedder {
        &self.embedder
    }

    /// Embed the question once and fetch the nearest entries of every
    /// category.
    #[tracing::instrument(skip(self, question), fields(limit = self.results_per_category))]
    pub async fn retrieve_examples(
        &self,
        question: &str,
    ) -> Result<RetrievedContext, RepositoryError> {
        let embedding = self.embedder.embed_one(question).await?;
        let limit = self.results_per_category;

        let (question_sql, ddl, documentation) = tokio::try_join!(
            self.store.similar_question_sql(&embedding, limit),
            self.store.related_ddl(&embedding, limit),
            self.store.related_documentation(&embedding, limit),
        )?;

        debug!(
            examples = question_sql.len(),
            ddl = ddl.len(),
            documentation = documentation.len(),
            "Retrieved context"
        );

        Ok(RetrievedContext {
            question_sql,
            ddl,
            documentation,
        })
    }

    /// Embed and store one training record. Returns its deterministic id.
    pub async fn train(&self, record: &TrainingRecord) -> Result<String, RepositoryError> {
        let id = deterministic_id(record);
        let embedding = self.embedder.embed_one(record.embedding_text()).await?;

        let _guard = self.write_guard.lock().await;
        match record {
            TrainingRecord::QuestionSql { question, sql } => {
                let pair = QuestionSql {
                    question: question.clone(),
                    sql: sql.clone(),
                };
                self.store.add_question_sql(&id, &pair, &embedding).await?;
            }
            TrainingRecord::Ddl { ddl } => {
                self.store.add_ddl(&id, ddl, &embedding).await?;
            }
            TrainingRecord::Documentation { documentation } => {
                self.store
                    .add_documentation(&id, documentation, &embedding)
                    .await?;
            }
        }

        info!(id = %id, kind = %record.kind(), "Trained knowledge entry");
        Ok(id)
    }

    pub async fn counts(&self) -> Result<KnowledgeCounts, RepositoryError> {
        self.store.counts().await
    }
}
