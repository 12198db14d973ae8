//! Typed views over query results.
//!
//! A [`ResultSet`] holds the raw rows and column metadata of one statement
//! and derives schemas and a columnar [`Table`] from them.

mod result_set;
mod table;
mod type_map;
mod types;

pub use result_set::ResultSet;
pub use table::{Table, TableColumn};
pub use type_map::{trino_type_to_value_type, TimeUnit, ValueType};
pub use types::{ColumnInfo, Row, Value};
