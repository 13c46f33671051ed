//! Setup-time training of the knowledge store.

use std::path::Path;

use anyhow::Context;
use console::style;

use tickertalk_core::training::{load_training_file, train_all};
use tickertalk_infra::sqlite::executor::SqliteExecutor;
use tickertalk_types::config::ServiceConfig;
use tickertalk_types::training::{TrainingRecord, TrainingSummary};

use crate::state::{knowledge_with_store, open_store};

/// Load `file` (and optionally the database DDL) into the knowledge store.
///
/// Every input is read before the store is touched, so a bad training file
/// leaves the store as it was.
pub async fn train(
    config: &ServiceConfig,
    file: &Path,
    schema: bool,
    reset: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut records = load_training_file(file).await?;

    if schema {
        let executor = SqliteExecutor::open(&config.database.path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open stock database {}",
                    config.database.path.display()
                )
            })?;
        let ddl = executor
            .schema_ddl()
            .await
            .context("Failed to read the database schema")?;
        records.extend(ddl_records(ddl));
    }

    let store = open_store(config).await?;
    if reset {
        store.reset().await?;
        tracing::info!("Knowledge store reset");
    }
    let knowledge = knowledge_with_store(config, store)?;

    let summary = train_all(&knowledge, &records).await?;
    let counts = knowledge.counts().await?;

    if json {
        let body = serde_json::json!({ "trained": summary, "stored": counts });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_summary(&summary);
        println!(
            "  {}",
            style(format!(
                "Store now holds {} question/SQL pairs, {} DDL statements, {} documentation entries.",
                counts.question_sql, counts.ddl, counts.documentation
            ))
            .dim()
        );
        println!();
    }
    Ok(())
}

fn ddl_records(statements: Vec<String>) -> impl Iterator<Item = TrainingRecord> {
    statements
        .into_iter()
        .filter(|ddl| !ddl.trim().is_empty())
        .map(|ddl| TrainingRecord::Ddl { ddl })
}

fn print_summary(summary: &TrainingSummary) {
    println!();
    println!(
        "  {} Trained {} records",
        style("✓").green().bold(),
        style(summary.total()).cyan().bold()
    );
    println!("    {:<14} {}", "question/SQL", summary.question_sql);
    println!("    {:<14} {}", "DDL", summary.ddl);
    println!("    {:<14} {}", "documentation", summary.documentation);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_records_skip_blank_statements() {
        let records: Vec<TrainingRecord> = ddl_records(vec![
            "CREATE TABLE stock_prices (ticker TEXT)".into(),
            "   ".into(),
        ])
        .collect();
        assert_eq!(
            records,
            vec![TrainingRecord::Ddl {
                ddl: "CREATE TABLE stock_prices (ticker TEXT)".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_training_file_fails_before_opening_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::default();
        let err = train(&config, &dir.path().join("absent.yaml"), false, false, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("training file not found"));
    }
}
