//! Setup-time training: load records from a file and store them in the
//! knowledge base.
//!
//! Runs before serving starts and fails fast. A missing file, a syntax
//! error, or a top level that is not a list of records is fatal.

use std::path::Path;

use tracing::info;

use tickertalk_types::error::TrainingError;
use tickertalk_types::training::{TrainingRecord, TrainingSummary};

use crate::knowledge::base::KnowledgeBase;
use crate::knowledge::store::KnowledgeStore;

/// Read a training file. `.yaml` / `.yml` files are parsed as YAML,
/// anything else as JSON.
pub async fn load_training_file(path: &Path) -> Result<Vec<TrainingRecord>, TrainingError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TrainingError::NotFound(path.to_path_buf())
        } else {
            TrainingError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let malformed = |message: String| TrainingError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    let records: Vec<TrainingRecord> = if is_yaml {
        let value: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(&content).map_err(|e| malformed(e.to_string()))?;
        if !value.is_sequence() {
            return Err(TrainingError::NotAList(path.to_path_buf()));
        }
        serde_yaml_ng::from_value(value).map_err(|e| malformed(e.to_string()))?
    } else {
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
        if !value.is_array() {
            return Err(TrainingError::NotAList(path.to_path_buf()));
        }
        serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?
    };

    info!(path = %path.display(), records = records.len(), "Loaded training file");
    Ok(records)
}

/// Train every record in order, stopping at the first store failure.
pub async fn train_all<S: KnowledgeStore>(
    kb: &KnowledgeBase<S>,
    records: &[TrainingRecord],
) -> Result<TrainingSummary, TrainingError> {
    let mut summary = TrainingSummary::default();
    for record in records {
        kb.train(record).await?;
        summary.record(record.kind());
    }
    info!(
        question_sql = summary.question_sql,
        ddl = summary.ddl,
        documentation = summary.documentation,
        "Training complete"
    );
    Ok(summary)
}
