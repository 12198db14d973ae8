//! Rendering of typed tables for the command line.

use std::str::FromStr;

use serde_json::{json, Map};

use crate::result::{Table, Value};

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text table.
    #[default]
    Text,
    /// One JSON object per row, in a JSON array.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Renders a table in the requested format.
pub fn render(table: &Table, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(table),
        OutputFormat::Json => render_json(table),
    }
}

fn render_text(table: &Table) -> String {
    let headers = table.column_names();
    let cells: Vec<Vec<String>> = (0..table.num_rows())
        .filter_map(|i| table.row(i))
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, &w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = format_line(headers.clone());
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(&format_line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }

    let noun = if table.num_rows() == 1 { "row" } else { "rows" };
    out.push_str(&format!("({} {noun})\n", table.num_rows()));
    out
}

fn render_json(table: &Table) -> String {
    let rows: Vec<serde_json::Value> = (0..table.num_rows())
        .filter_map(|i| table.row(i))
        .map(|row| {
            let object: Map<String, serde_json::Value> = table
                .column_names()
                .into_iter()
                .zip(row)
                .map(|(name, value)| (name.to_string(), value_to_json(value)))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();

    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

/// Plain JSON for a cell, without the enum tagging of `Value`'s own serde form.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Json(j) => j.clone(),
        other => json!(other.to_display_string()),
    }
}
