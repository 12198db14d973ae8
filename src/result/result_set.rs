//! Immutable result of a completed query.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::table::{normalize_null, to_timestamp_value, Table, TableColumn};
use super::type_map::{trino_type_to_value_type, ValueType};
use super::types::{ColumnInfo, Row, Value};
use crate::error::{Result, TrinoError};

/// Rows and column metadata returned by one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResultSet")]
pub struct ResultSet {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
    query_id: Option<String>,
    #[serde(with = "duration_serde")]
    execution_time: Duration,
}

/// Unchecked serde form of [`ResultSet`].
#[derive(Deserialize)]
struct RawResultSet {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
    query_id: Option<String>,
    #[serde(with = "duration_serde")]
    execution_time: Duration,
}

impl TryFrom<RawResultSet> for ResultSet {
    type Error = TrinoError;

    fn try_from(raw: RawResultSet) -> Result<Self> {
        Ok(Self::new(raw.columns, raw.rows)?
            .with_query_id(raw.query_id)
            .with_execution_time(raw.execution_time))
    }
}

impl ResultSet {
    /// Creates a result set, checking that every row is as wide as the metadata.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(TrinoError::internal(format!(
                "row {index} has {} values but the result has {} columns",
                row.len(),
                columns.len()
            )));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                warn!(
                    "Duplicate column name '{}' in result; name-keyed views keep the last one",
                    column.name
                );
            }
        }

        Ok(Self {
            columns,
            rows,
            query_id: None,
            execution_time: Duration::ZERO,
        })
    }

    /// Sets the engine-assigned query id.
    pub fn with_query_id(mut self, query_id: Option<String>) -> Self {
        self.query_id = query_id;
        self
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Column metadata in result order.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Raw rows as returned by the engine.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    /// Column names in metadata order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Column name to engine type name. Later duplicates overwrite earlier ones.
    pub fn schema(&self) -> HashMap<String, String> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.data_type.clone()))
            .collect()
    }

    /// Column name to in-memory value type.
    ///
    /// Fails with [`TrinoError::UnsupportedType`] on the first engine type
    /// without a mapping.
    pub fn typed_schema(&self) -> Result<HashMap<String, ValueType>> {
        self.columns
            .iter()
            .map(|c| Ok((c.name.clone(), trino_type_to_value_type(&c.data_type)?)))
            .collect()
    }

    /// Materializes a columnar table.
    ///
    /// Timestamp-family columns are parsed into timestamps, with unparseable
    /// cells becoming `Null`. Every other column passes through unchanged
    /// apart from NaN floats, which become `Null`. The type map is not
    /// consulted, so unknown engine types do not fail here.
    pub fn to_table(&self) -> Table {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, info)| {
                let convert: fn(&Value) -> Value = if info.is_timestamp() {
                    to_timestamp_value
                } else {
                    normalize_null
                };
                TableColumn {
                    name: info.name.clone(),
                    data_type: info.data_type.clone(),
                    values: self.rows.iter().map(|row| convert(&row[index])).collect(),
                }
            })
            .collect();

        Table::new(columns, self.rows.len())
    }
}

/// Serde support for Duration (not natively supported by serde).
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_nanos().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u128::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}
