//! Mock engine for testing.
//!
//! Serves scripted results and counts every call so lifecycle guarantees
//! (one close per query, no cancel after completion) can be asserted.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Connector, Cursor, StatementOutput};
use crate::config::SessionConfig;
use crate::error::{EngineError, Result, TrinoError};
use crate::result::{ColumnInfo, Row, Value};

/// A mock cursor that returns a predefined result.
#[derive(Debug, Default)]
pub struct MockCursor {
    result: Option<(Vec<ColumnInfo>, Vec<Row>)>,
    error: Option<EngineError>,
    delay: Option<Duration>,
    fail_cancel: bool,
    in_flight: AtomicBool,
    executes: AtomicUsize,
    cancels: AtomicUsize,
    closes: AtomicUsize,
}

impl MockCursor {
    /// Creates a mock cursor that echoes SELECT statements back as one row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the given columns and rows for every statement.
    pub fn with_result(mut self, columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        self.result = Some((columns, rows));
        self
    }

    /// Fails every statement with the given engine error.
    pub fn with_error(mut self, error: EngineError) -> Self {
        self.error = Some(error);
        self
    }

    /// Makes every statement take this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes engine-level cancel calls fail, as when the statement already finished.
    pub fn with_failing_cancel(mut self) -> Self {
        self.fail_cancel = true;
        self
    }

    pub fn execute_count(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn output_for(&self, sql: &str) -> StatementOutput {
        let (columns, rows) = match &self.result {
            Some((columns, rows)) => (columns.clone(), rows.clone()),
            None if sql.trim_start().to_uppercase().starts_with("SELECT") => (
                vec![ColumnInfo::new("result", "varchar")],
                vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            ),
            None => (vec![], vec![]),
        };

        StatementOutput {
            columns,
            rows,
            query_id: Some(format!("mock_{}", self.execute_count())),
        }
    }
}

#[async_trait]
impl Cursor for MockCursor {
    async fn execute(&self, sql: &str) -> Result<StatementOutput> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.in_flight.store(true, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.store(false, Ordering::SeqCst);
        match &self.error {
            Some(error) => Err(TrinoError::Query(error.clone())),
            None => Ok(self.output_for(sql)),
        }
    }

    async fn cancel(&self) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel || !self.in_flight.swap(false, Ordering::SeqCst) {
            return Err(TrinoError::internal("No statement in flight"));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// A connector handing out one shared [`MockCursor`].
#[derive(Debug)]
pub struct MockConnector {
    cursor: Arc<MockCursor>,
    failure: Option<String>,
    connects: AtomicUsize,
    last_config: Mutex<Option<SessionConfig>>,
}

impl MockConnector {
    /// Creates a connector that always returns `cursor`.
    pub fn new(cursor: Arc<MockCursor>) -> Self {
        Self {
            cursor,
            failure: None,
            connects: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        }
    }

    /// Creates a connector whose connect attempts fail with a connection error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(Arc::new(MockCursor::new()))
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// The configuration passed to the most recent connect call.
    pub async fn last_config(&self) -> Option<SessionConfig> {
        self.last_config.lock().await.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, config: &SessionConfig) -> Result<Arc<dyn Cursor>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().await = Some(config.clone());

        match &self.failure {
            Some(message) => Err(TrinoError::connection(message.clone())),
            None => Ok(self.cursor.clone()),
        }
    }
}
