//! Engine abstraction layer.
//!
//! Provides a trait-based interface to the query engine so the query
//! lifecycle does not depend on the transport. [`TrinoConnector`] speaks the
//! Trino client protocol; [`MockConnector`] serves scripted results in tests.

mod mock;
mod trino;

pub use mock::{MockConnector, MockCursor};
pub use trino::{TrinoConnector, TrinoCursor};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::result::{ColumnInfo, Row};

/// Everything the engine returned for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutput {
    /// Column metadata reported by the engine.
    pub columns: Vec<ColumnInfo>,

    /// All rows, in engine order.
    pub rows: Vec<Row>,

    /// Engine-assigned query id.
    pub query_id: Option<String>,
}

/// A stateful handle used to submit statements to the engine.
///
/// A cursor runs one statement at a time. It is shared between the session
/// that created it and the query currently using it, so every method takes
/// `&self`.
#[async_trait]
pub trait Cursor: Send + Sync {
    /// Submits a statement and waits for all rows or an engine error.
    async fn execute(&self, sql: &str) -> Result<StatementOutput>;

    /// Asks the engine to cancel the statement in flight.
    ///
    /// Fails when nothing is in flight, e.g. because the statement already finished.
    async fn cancel(&self) -> Result<()>;

    /// Releases the current statement. The cursor stays usable afterwards.
    async fn close(&self) -> Result<()>;
}

/// Factory for cursors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a cursor for the given, already resolved, configuration.
    async fn connect(&self, config: &SessionConfig) -> Result<Arc<dyn Cursor>>;
}
