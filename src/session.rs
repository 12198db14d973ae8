//! Session: the single point of cursor acquisition and query creation.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::engine::{Connector, Cursor, TrinoConnector};
use crate::error::Result;
use crate::query::Query;
use crate::result::ResultSet;

/// Owns one lazily created cursor and creates queries bound to it.
///
/// One query is expected in flight per session at a time; the cursor is not
/// guarded for concurrent statements.
pub struct Session {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    cursor: OnceCell<Arc<dyn Cursor>>,
}

impl Session {
    /// Creates a session talking to Trino. Unset fields come from the environment.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_connector(config, Arc::new(TrinoConnector::new()))
    }

    /// Creates a session using a custom connector. Unset fields come from the environment.
    pub fn with_connector(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        Self::with_env_lookup(config, connector, |key| std::env::var(key).ok())
    }

    /// Creates a session resolving unset fields through `lookup` instead of the process environment.
    pub fn with_env_lookup<F>(mut config: SessionConfig, connector: Arc<dyn Connector>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        config.apply_env_from(lookup);
        Self {
            config,
            connector,
            cursor: OnceCell::new(),
        }
    }

    /// The resolved configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true once the cursor has been created.
    pub fn is_connected(&self) -> bool {
        self.cursor.initialized()
    }

    /// Returns the session cursor, creating it on first use.
    async fn cursor(&self) -> Result<Arc<dyn Cursor>> {
        let cursor = self
            .cursor
            .get_or_try_init(|| async {
                info!("Connecting to {}", self.config.display_string());
                self.connector.connect(&self.config).await
            })
            .await?;
        Ok(Arc::clone(cursor))
    }

    /// Creates a query bound to the session cursor without executing it.
    pub async fn create_query(&self, text: impl Into<String>) -> Result<Query> {
        let cursor = self.cursor().await?;
        Ok(Query::new(text, cursor))
    }

    /// Creates and executes a query.
    pub async fn execute_query(&self, text: impl Into<String>) -> Result<ResultSet> {
        let mut query = self.create_query(text).await?;
        query.execute().await
    }

    /// Creates and executes a query that stops when `token` is cancelled.
    pub async fn execute_query_with_cancel(
        &self,
        text: impl Into<String>,
        token: &CancellationToken,
    ) -> Result<ResultSet> {
        let mut query = self.create_query(text).await?.with_cancellation(token);
        debug!("Executing with external cancellation");
        query.execute().await
    }
}
