//! Execution lifecycle of a single statement.
//!
//! A [`Query`] runs on the calling task and can be cancelled from any other
//! task through a [`QueryHandle`] or a [`CancellationToken`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{AtomicQueryState, QueryState};
use crate::engine::Cursor;
use crate::error::{Result, TrinoError};
use crate::result::ResultSet;

/// State shared between a query and its handles.
struct Shared {
    text: String,
    state: AtomicQueryState,
    cursor: Arc<dyn Cursor>,
    closed: AtomicBool,
    token: CancellationToken,
}

impl Shared {
    /// Closes the cursor unless this query already did.
    async fn close_once(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.cursor.close().await
    }

    async fn cancel(&self) {
        match self.state.transition(QueryState::Running, QueryState::Cancelled) {
            Ok(()) => {}
            Err(QueryState::Pending) => {
                debug!("Cancel requested before execution; query will stop on start");
                self.token.cancel();
                return;
            }
            Err(state) => {
                debug!("Ignoring cancel for query in state {state}");
                return;
            }
        }

        info!("Cancelling query");
        if let Err(e) = self.cursor.cancel().await {
            // The engine finished between our state change and the cancel call.
            debug!("Engine-level cancel failed: {e}");
        }
        if let Err(e) = self.close_once().await {
            warn!("Failed to close cursor after cancel: {e}");
        }
        self.token.cancel();
    }
}

/// One SQL statement and its execution lifecycle.
pub struct Query {
    shared: Arc<Shared>,
    external: CancellationToken,
    execution_time: Option<Duration>,
}

impl Query {
    /// Creates a pending query bound to `cursor`.
    pub fn new(text: impl Into<String>, cursor: Arc<dyn Cursor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                text: text.into(),
                state: AtomicQueryState::default(),
                cursor,
                closed: AtomicBool::new(false),
                token: CancellationToken::new(),
            }),
            external: CancellationToken::new(),
            execution_time: None,
        }
    }

    /// Also cancels the query when `token` is cancelled.
    pub fn with_cancellation(mut self, token: &CancellationToken) -> Self {
        self.external = token.clone();
        self
    }

    /// Statement text.
    pub fn text(&self) -> &str {
        &self.shared.text
    }

    /// Current lifecycle state.
    pub fn state(&self) -> QueryState {
        self.shared.state.load()
    }

    /// Wall time between submission and the last row, once Completed.
    pub fn execution_time(&self) -> Option<Duration> {
        self.execution_time
    }

    /// A cloneable handle that can cancel this query from another task.
    pub fn handle(&self) -> QueryHandle {
        QueryHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Token cancelled once this query has been cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.token.clone()
    }

    /// Runs the statement and waits for its result.
    ///
    /// The cursor is closed exactly once whatever the outcome. Returns
    /// [`TrinoError::Cancelled`] if a cancellation won the race against
    /// completion, and the engine's error if the statement failed.
    pub async fn execute(&mut self) -> Result<ResultSet> {
        let shared = Arc::clone(&self.shared);

        if let Err(state) = shared
            .state
            .transition(QueryState::Pending, QueryState::Running)
        {
            return Err(TrinoError::internal(format!(
                "Query cannot be executed in state {state}"
            )));
        }

        debug!("Executing query: {}", shared.text);
        let start = Instant::now();

        let outcome = tokio::select! {
            biased;

            _ = shared.token.cancelled() => None,
            _ = self.external.cancelled() => None,
            result = shared.cursor.execute(&shared.text) => Some(result),
        };

        let result = match outcome {
            None => {
                shared.cancel().await;
                Err(TrinoError::Cancelled)
            }
            Some(Ok(output)) => {
                let elapsed = start.elapsed();
                match ResultSet::new(output.columns, output.rows) {
                    Ok(result_set) => {
                        match shared
                            .state
                            .transition(QueryState::Running, QueryState::Completed)
                        {
                            Ok(()) => {
                                self.execution_time = Some(elapsed);
                                info!(
                                    "Query completed in {:?} with {} rows",
                                    elapsed,
                                    result_set.row_count()
                                );
                                Ok(result_set
                                    .with_query_id(output.query_id)
                                    .with_execution_time(elapsed))
                            }
                            Err(_) => Err(TrinoError::Cancelled),
                        }
                    }
                    Err(e) => self.fail(e),
                }
            }
            Some(Err(e)) => self.fail(e),
        };

        if let Err(e) = shared.close_once().await {
            warn!("Failed to close cursor: {e}");
        }

        result
    }

    /// Moves Running to Error. A cancel that got there first takes precedence.
    fn fail(&self, error: TrinoError) -> Result<ResultSet> {
        match self
            .shared
            .state
            .transition(QueryState::Running, QueryState::Error)
        {
            Ok(()) => {
                warn!("Query failed: {error}");
                Err(error)
            }
            Err(_) => Err(TrinoError::Cancelled),
        }
    }

    /// Cancels the query if it is running. Never fails.
    pub async fn cancel(&self) {
        self.shared.cancel().await;
    }

    /// Releases the cursor. Only the first call per query reaches the cursor.
    pub async fn close(&self) -> Result<()> {
        self.shared.close_once().await
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("text", &self.shared.text)
            .field("state", &self.state())
            .field("execution_time", &self.execution_time)
            .finish()
    }
}

/// Cancels a [`Query`] from another task.
#[derive(Clone)]
pub struct QueryHandle {
    shared: Arc<Shared>,
}

impl QueryHandle {
    pub fn state(&self) -> QueryState {
        self.shared.state.load()
    }

    /// Same as [`Query::cancel`].
    pub async fn cancel(&self) {
        self.shared.cancel().await;
    }
}
