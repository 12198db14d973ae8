//! Columnar table materialized from a result set.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::Value;
use crate::error::{Result, TrinoError};

/// Layouts accepted for zoneless timestamps.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Layouts accepted for timestamps carrying a numeric offset.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

/// One named column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name.
    pub name: String,

    /// Engine type name the column was built from.
    pub data_type: String,

    /// Cell values, one per row.
    pub values: Vec<Value>,
}

/// A column-oriented table. All columns have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<TableColumn>,
    num_rows: usize,
}

/// Unchecked serde form of [`Table`].
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<TableColumn>,
    num_rows: usize,
}

impl TryFrom<RawTable> for Table {
    type Error = TrinoError;

    fn try_from(raw: RawTable) -> Result<Self> {
        if let Some(column) = raw.columns.iter().find(|c| c.values.len() != raw.num_rows) {
            return Err(TrinoError::internal(format!(
                "column '{}' has {} values but the table has {} rows",
                column.name,
                column.values.len(),
                raw.num_rows
            )));
        }
        Ok(Self::new(raw.columns, raw.num_rows))
    }
}

impl Table {
    pub(crate) fn new(columns: Vec<TableColumn>, num_rows: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == num_rows));
        Self { columns, num_rows }
    }

    /// All columns in result order.
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Looks up a column by name.
    ///
    /// With duplicate names the last one wins, matching `ResultSet::schema`.
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().rev().find(|c| c.name == name)
    }

    /// Column names in result order, duplicates included.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Returns the cells of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.num_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }
}

/// Parses an engine timestamp string.
///
/// Zoned values are normalized to UTC. Region-named zones other than UTC
/// cannot be resolved without a zone database and yield `None`.
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    let naive_part = trimmed
        .strip_suffix(" UTC")
        .or_else(|| trimmed.strip_suffix('Z'))
        .unwrap_or(trimmed);

    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(naive_part, fmt) {
            return Some(ts);
        }
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(ts.naive_utc());
        }
    }

    NaiveDate::parse_from_str(naive_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Converts a timestamp-column cell. Anything that is not a parseable timestamp becomes `Null`.
pub(crate) fn to_timestamp_value(value: &Value) -> Value {
    match value {
        Value::Timestamp(ts) => Value::Timestamp(*ts),
        Value::String(s) => match parse_timestamp(s) {
            Some(ts) => Value::Timestamp(ts),
            None => {
                debug!("Dropping unparseable timestamp cell {s:?}");
                Value::Null
            }
        },
        Value::Null => Value::Null,
        other => {
            debug!("Dropping non-text timestamp cell {other:?}");
            Value::Null
        }
    }
}

/// Normalizes missing values in a pass-through column to the single null marker.
pub(crate) fn normalize_null(value: &Value) -> Value {
    match value {
        Value::Float(f) if f.is_nan() => Value::Null,
        other => other.clone(),
    }
}
