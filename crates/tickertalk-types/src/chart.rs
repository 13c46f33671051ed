//! Chart description and rendered figure types.
//!
//! The LLM describes a chart as a [`ChartSpec`]; the core chart builder binds
//! that description to a query result and produces a Plotly-compatible
//! [`Figure`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Kind of chart to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Pie,
    /// A single headline number.
    Indicator,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Line => write!(f, "line"),
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::Scatter => write!(f, "scatter"),
            ChartKind::Pie => write!(f, "pie"),
            ChartKind::Indicator => write!(f, "indicator"),
        }
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            "scatter" => Ok(ChartKind::Scatter),
            "pie" => Ok(ChartKind::Pie),
            "indicator" => Ok(ChartKind::Indicator),
            other => Err(format!("invalid chart kind: '{other}'")),
        }
    }
}

/// Declarative chart description requested from the LLM.
///
/// Column references must name columns of the query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartSpec {
    /// Chart type.
    pub kind: ChartKind,
    /// Column used for the x axis (line, bar, scatter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Columns plotted on the y axis, one trace per column. For an
    /// indicator, the first entry is the value column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<String>,
    /// Column holding slice labels (pie only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<String>,
    /// Column holding slice sizes (pie only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
    /// Chart title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ChartSpec {
    /// Every column name the spec refers to.
    pub fn referenced_columns(&self) -> Vec<&str> {
        self.x
            .iter()
            .chain(self.y.iter())
            .chain(self.names.iter())
            .chain(self.values.iter())
            .map(String::as_str)
            .collect()
    }
}

/// A rendered, Plotly-compatible figure: `{"data": [...], "layout": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}

impl Figure {
    /// Number of traces in the figure.
    pub fn trace_count(&self) -> usize {
        self.data.len()
    }

    /// Plotly trace type of the first trace, if any.
    pub fn first_trace_type(&self) -> Option<&str> {
        self.data.first()?.get("type")?.as_str()
    }
}
