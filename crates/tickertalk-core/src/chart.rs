//! Chart figure building.
//!
//! The model describes the chart as a [`ChartSpec`]; this module validates
//! that description against the query result and renders a Plotly-compatible
//! [`Figure`]. When no usable description exists, a figure is chosen from
//! the column types alone.

use serde_json::{Map, Value, json};
use tracing::debug;

use tickertalk_types::chart::{ChartKind, ChartSpec, Figure};
use tickertalk_types::query::{ColumnKind, QueryResult};

/// Categorical columns with fewer distinct values than this may become a pie.
const PIE_MAX_SLICES: usize = 10;

/// Parse a chart description from a model response and check it against
/// the result columns. Code fences around the JSON are tolerated.
///
/// Returns `None` for anything unusable: invalid JSON, unknown columns, or
/// a description missing the columns its kind needs.
pub fn parse_chart_spec(response: &str, result: &QueryResult) -> Option<ChartSpec> {
    let body = strip_fence(response);
    let spec: ChartSpec = match serde_json::from_str(body) {
        Ok(spec) => spec,
        Err(e) => {
            debug!(error = %e, "Chart spec is not valid JSON");
            return None;
        }
    };

    if let Some(unknown) = spec
        .referenced_columns()
        .into_iter()
        .find(|c| result.column_index(c).is_none())
    {
        debug!(column = %unknown, "Chart spec references unknown column");
        return None;
    }

    let complete = match spec.kind {
        ChartKind::Line | ChartKind::Bar | ChartKind::Scatter => {
            spec.x.is_some() && !spec.y.is_empty()
        }
        ChartKind::Pie => spec.names.is_some() && spec.values.is_some(),
        ChartKind::Indicator => !spec.y.is_empty() || result.columns.len() == 1,
    };
    complete.then_some(spec)
}

fn strip_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Render a figure for `result`, from `spec` when given, otherwise from the
/// column-type heuristic.
pub fn build_figure(spec: Option<&ChartSpec>, result: &QueryResult, dark_mode: bool) -> Figure {
    let spec = match spec {
        Some(spec) => spec.clone(),
        None => heuristic_spec(result),
    };

    let data = match spec.kind {
        ChartKind::Line | ChartKind::Scatter | ChartKind::Bar => xy_traces(&spec, result),
        ChartKind::Pie => pie_trace(&spec, result).into_iter().collect(),
        ChartKind::Indicator => indicator_trace(&spec, result).into_iter().collect(),
    };

    let mut layout = Map::new();
    if let Some(title) = &spec.title {
        layout.insert("title".into(), json!({ "text": title }));
    }
    if matches!(spec.kind, ChartKind::Line | ChartKind::Scatter | ChartKind::Bar) {
        if let Some(x) = &spec.x {
            layout.insert("xaxis".into(), json!({ "title": { "text": x } }));
        }
        if spec.y.len() == 1 {
            layout.insert("yaxis".into(), json!({ "title": { "text": spec.y[0] } }));
        }
    }
    if dark_mode {
        layout.insert("template".into(), json!("plotly_dark"));
    }

    Figure {
        data,
        layout: Value::Object(layout),
    }
}

/// Pick a chart from column types alone.
///
/// A single value becomes an indicator; two or more numeric columns a
/// scatter of the first two; one numeric column with a categorical one a
/// bar; a categorical column with few distinct values a pie; anything else
/// a line over every numeric column.
pub fn heuristic_spec(result: &QueryResult) -> ChartSpec {
    let kinds = result.column_kinds();
    let numeric: Vec<&String> = columns_of(result, &kinds, ColumnKind::Numeric);
    let categorical: Vec<&String> = columns_of(result, &kinds, ColumnKind::Categorical);

    let base = ChartSpec {
        kind: ChartKind::Line,
        x: None,
        y: Vec::new(),
        names: None,
        values: None,
        title: None,
    };

    if result.is_single_value() {
        return ChartSpec {
            kind: ChartKind::Indicator,
            y: result.columns.clone(),
            ..base
        };
    }

    if numeric.len() >= 2 {
        return ChartSpec {
            kind: ChartKind::Scatter,
            x: Some(numeric[0].clone()),
            y: vec![numeric[1].clone()],
            ..base
        };
    }

    if numeric.len() == 1 && !categorical.is_empty() {
        return ChartSpec {
            kind: ChartKind::Bar,
            x: Some(categorical[0].clone()),
            y: vec![numeric[0].clone()],
            ..base
        };
    }

    if let Some(&first) = categorical.first() {
        let index = result.column_index(first).unwrap_or(0);
        if result.distinct_count(index) < PIE_MAX_SLICES {
            return ChartSpec {
                kind: ChartKind::Pie,
                names: Some(first.clone()),
                values: numeric.first().map(|c| (*c).clone()),
                ..base
            };
        }
    }

    ChartSpec {
        kind: ChartKind::Line,
        x: None,
        y: numeric.into_iter().cloned().collect(),
        ..base
    }
}

fn columns_of<'a>(result: &'a QueryResult, kinds: &[ColumnKind], want: ColumnKind) -> Vec<&'a String> {
    result
        .columns
        .iter()
        .zip(kinds)
        .filter(|(_, k)| **k == want)
        .map(|(c, _)| c)
        .collect()
}

fn column(result: &QueryResult, name: &str) -> Vec<Value> {
    result
        .column_index(name)
        .map(|i| result.column_values(i))
        .unwrap_or_default()
}

fn xy_traces(spec: &ChartSpec, result: &QueryResult) -> Vec<Value> {
    let x = match &spec.x {
        Some(name) => column(result, name),
        None => (0..result.row_count()).map(|i| json!(i)).collect(),
    };

    spec.y
        .iter()
        .map(|name| {
            let mut trace = json!({
                "name": name,
                "x": x,
                "y": column(result, name),
            });
            match spec.kind {
                ChartKind::Bar => trace["type"] = json!("bar"),
                ChartKind::Scatter => {
                    trace["type"] = json!("scatter");
                    trace["mode"] = json!("markers");
                }
                _ => {
                    trace["type"] = json!("scatter");
                    trace["mode"] = json!("lines");
                }
            }
            trace
        })
        .collect()
}

/// A pie without a values column counts occurrences of each label.
fn pie_trace(spec: &ChartSpec, result: &QueryResult) -> Option<Value> {
    let labels_column = spec.names.as_deref()?;
    let labels = column(result, labels_column);

    let (labels, values) = match spec.values.as_deref() {
        Some(values_column) => (labels, column(result, values_column)),
        None => {
            let mut counted: Vec<(Value, u64)> = Vec::new();
            for label in labels {
                match counted.iter_mut().find(|(l, _)| *l == label) {
                    Some((_, n)) => *n += 1,
                    None => counted.push((label, 1)),
                }
            }
            counted
                .into_iter()
                .map(|(l, n)| (l, json!(n)))
                .unzip()
        }
    };

    Some(json!({
        "type": "pie",
        "labels": labels,
        "values": values,
    }))
}

fn indicator_trace(spec: &ChartSpec, result: &QueryResult) -> Option<Value> {
    let name = spec.y.first().or_else(|| result.columns.first())?;
    let value = column(result, name).into_iter().next().unwrap_or(Value::Null);
    Some(json!({
        "type": "indicator",
        "mode": "number",
        "value": value,
        "title": { "text": name },
    }))
}
