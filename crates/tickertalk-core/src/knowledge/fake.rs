//! In-memory embedder and store used by core unit tests.

use std::future::Future;
use std::sync::Mutex;

use tickertalk_types::error::RepositoryError;
use tickertalk_types::knowledge::{KnowledgeCounts, QuestionSql};
use tickertalk_types::training::TrainingKind;

use super::embedder::Embedder;
use super::store::KnowledgeStore;

/// Bag-of-words embedder: each lowercase word bumps one hashed dimension.
/// Texts sharing words land close together.
pub(crate) struct HashEmbedder {
    dimension: usize,
    silent: bool,
}

impl HashEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            silent: false,
        }
    }

    /// An embedder that returns no vectors at all.
    pub(crate) fn silent() -> Self {
        Self {
            dimension: 8,
            silent: true,
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for word in text.to_lowercase().split_whitespace() {
            let h = word
                .bytes()
                .fold(2166136261u32, |acc, b| (acc ^ b as u32).wrapping_mul(16777619));
            v[h as usize % self.dimension] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, RepositoryError>> + Send {
        let out = if self.silent {
            Vec::new()
        } else {
            texts.iter().map(|t| self.vector(t)).collect()
        };
        async move { Ok(out) }
    }

    fn model_name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

struct Entry {
    id: String,
    kind: TrainingKind,
    question: String,
    content: String,
    vector: Vec<f32>,
}

/// Brute-force cosine search over a `Vec`.
#[derive(Default)]
pub(crate) struct InMemoryKnowledgeStore {
    entries: Mutex<Vec<Entry>>,
}

impl InMemoryKnowledgeStore {
    fn upsert(&self, entry: Entry) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.id != entry.id);
        entries.push(entry);
    }

    fn nearest(&self, kind: TrainingKind, query: &[f32], limit: usize) -> Vec<(String, String)> {
        let entries = self.entries.lock().unwrap();
        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| {
                let dot: f32 = e.vector.iter().zip(query).map(|(a, b)| a * b).sum();
                (dot, e)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| (e.question.clone(), e.content.clone()))
            .collect()
    }

    fn count(&self, kind: TrainingKind) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

impl KnowledgeStore for InMemoryKnowledgeStore {
    fn add_question_sql(
        &self,
        id: &str,
        pair: &QuestionSql,
        embedding: &[f32],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.upsert(Entry {
            id: id.to_string(),
            kind: TrainingKind::QuestionSql,
            question: pair.question.clone(),
            content: pair.sql.clone(),
            vector: embedding.to_vec(),
        });
        async { Ok(()) }
    }

    fn add_ddl(
        &self,
        id: &str,
        ddl: &str,
        embedding: &[f32],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.upsert(Entry {
            id: id.to_string(),
            kind: TrainingKind::Ddl,
            question: String::new(),
            content: ddl.to_string(),
            vector: embedding.to_vec(),
        });
        async { Ok(()) }
    }

    fn add_documentation(
        &self,
        id: &str,
        documentation: &str,
        embedding: &[f32],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.upsert(Entry {
            id: id.to_string(),
            kind: TrainingKind::Documentation,
            question: String::new(),
            content: documentation.to_string(),
            vector: embedding.to_vec(),
        });
        async { Ok(()) }
    }

    fn similar_question_sql(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<QuestionSql>, RepositoryError>> + Send {
        let found = self
            .nearest(TrainingKind::QuestionSql, embedding, limit)
            .into_iter()
            .map(|(question, sql)| QuestionSql { question, sql })
            .collect();
        async { Ok(found) }
    }

    fn related_ddl(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, RepositoryError>> + Send {
        let found = self
            .nearest(TrainingKind::Ddl, embedding, limit)
            .into_iter()
            .map(|(_, ddl)| ddl)
            .collect();
        async { Ok(found) }
    }

    fn related_documentation(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, RepositoryError>> + Send {
        let found = self
            .nearest(TrainingKind::Documentation, embedding, limit)
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        async { Ok(found) }
    }

    fn counts(&self) -> impl Future<Output = Result<KnowledgeCounts, RepositoryError>> + Send {
        let counts = KnowledgeCounts {
            question_sql: self.count(TrainingKind::QuestionSql),
            ddl: self.count(TrainingKind::Ddl),
            documentation: self.count(TrainingKind::Documentation),
        };
        async move { Ok(counts) }
    }
}
