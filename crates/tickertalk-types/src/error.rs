use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

/// Failures of a single pipeline run. None of these are retried; each one
/// is surfaced to the user and leaves the session history untouched.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// SQL could not be generated (retrieval or LLM failure, empty output).
    #[error("could not translate the question into SQL: {0}")]
    Translation(String),

    /// The database rejected the generated SQL.
    #[error("SQL execution failed: {0}")]
    Execution(String),

    /// Chart or follow-up generation failed.
    #[error("rendering failed: {0}")]
    Rendering(String),

    /// The streamed summary completion failed.
    #[error("summary completion failed: {0}")]
    Completion(#[from] LlmError),
}

impl PipelineError {
    /// Stable code exposed at the adapter boundary.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Translation(_) => "TRANSLATION_ERROR",
            PipelineError::Execution(_) => "EXECUTION_ERROR",
            PipelineError::Rendering(_) => "RENDERING_ERROR",
            PipelineError::Completion(_) => "COMPLETION_ERROR",
        }
    }
}

/// Setup-time training failures. Fatal: the service must not start.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("training file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read training file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed training file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("training file {} must contain a list of records", .0.display())]
    NotAList(PathBuf),

    #[error("failed to store training record: {0}")]
    Store(#[from] RepositoryError),
}

/// Configuration failures. Fatal: the service must not start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(String),

    #[error("malformed configuration file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from store and embedder operations (used by trait definitions in
/// tickertalk-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
