//! Pipeline output: the composite reply and the streamed progress events.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chart::Figure;
use crate::query::QueryResult;

/// Action name carried by every follow-up suggestion.
pub const FOLLOW_UP_ACTION: &str = "question";

/// A clickable follow-up suggestion. Clicking it submits `value` as if the
/// user had typed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpAction {
    pub name: String,
    pub label: String,
    pub value: String,
}

impl FollowUpAction {
    pub fn question(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            name: FOLLOW_UP_ACTION.to_string(),
            label: text.clone(),
            value: text,
        }
    }
}

/// The composite result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Full summary text (already delivered incrementally as tokens).
    pub text: String,
    /// The SQL that produced `table`.
    pub sql: String,
    pub chart: Figure,
    pub table: QueryResult,
    pub actions: Vec<FollowUpAction>,
}

/// Named pipeline stages surfaced to the user as they complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    WriteSql,
    ExecuteSql,
    Plot,
    FollowUp,
}

impl StepKind {
    /// Content language of the step output, for syntax highlighting.
    pub fn language(&self) -> Option<&'static str> {
        match self {
            StepKind::WriteSql => Some("sql"),
            StepKind::ExecuteSql => Some("markdown"),
            StepKind::Plot => Some("json"),
            StepKind::FollowUp => None,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::WriteSql => write!(f, "write_sql"),
            StepKind::ExecuteSql => write!(f, "execute_sql"),
            StepKind::Plot => write!(f, "plot"),
            StepKind::FollowUp => write!(f, "follow_up"),
        }
    }
}

/// A completed pipeline stage and its displayable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: StepKind,
    pub output: String,
}

/// Progress events streamed while a pipeline runs, in production order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Step(StepRecord),
    Token { text: String },
}
