//! Trino client protocol over HTTP.
//!
//! Provides the `TrinoCursor` struct that implements the `Cursor` trait by
//! posting statements to `/v1/statement` and following `nextUri` until the
//! engine has produced every page.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::{Connector, Cursor, StatementOutput};
use crate::config::SessionConfig;
use crate::error::{EngineError, Result, TrinoError};
use crate::result::{ColumnInfo, Row, Value};

/// Timeout for establishing TCP connections. Statements themselves are not timed out.
const CONNECT_TIMEOUT_SECS: u64 = 10;

const HEADER_USER: &str = "X-Trino-User";
const HEADER_CATALOG: &str = "X-Trino-Catalog";
const HEADER_SCHEMA: &str = "X-Trino-Schema";
const HEADER_SOURCE: &str = "X-Trino-Source";

const USER_AGENT: &str = concat!("trino-query/", env!("CARGO_PKG_VERSION"));

/// Creates [`TrinoCursor`]s after checking the coordinator is reachable.
#[derive(Debug, Clone, Default)]
pub struct TrinoConnector;

impl TrinoConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TrinoConnector {
    async fn connect(&self, config: &SessionConfig) -> Result<Arc<dyn Cursor>> {
        let cursor = TrinoCursor::connect(config.clone()).await?;
        Ok(Arc::new(cursor))
    }
}

/// Cursor speaking the Trino HTTP client protocol.
///
/// Clones share the statement in flight.
#[derive(Debug, Clone)]
pub struct TrinoCursor {
    client: Client,
    config: SessionConfig,
    base_url: Url,
    statement: Arc<Mutex<StatementSlot>>,
}

/// Progress of the statement the cursor is running.
#[derive(Debug, Default)]
struct StatementSlot {
    /// Bumped by every `execute`; a submission from an older one is stale.
    generation: u64,
    /// The POST has been sent but its first page has not been handled yet.
    submitting: bool,
    cancelled: bool,
    /// `nextUri` of the statement in flight, if any.
    next_uri: Option<String>,
}

impl TrinoCursor {
    /// Creates a cursor without contacting the coordinator.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrinoError::connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            base_url,
            statement: Arc::new(Mutex::new(StatementSlot::default())),
        })
    }

    /// Creates a cursor and checks `/v1/info` so unreachable coordinators fail early.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let cursor = Self::new(config)?;
        let info = cursor.server_info().await?;

        if info.starting {
            return Err(TrinoError::connection(format!(
                "Coordinator at {} is still starting",
                cursor.base_url
            )));
        }

        info!(
            "Connected to Trino {} at {}",
            info.node_version.version,
            cursor.config.display_string()
        );
        Ok(cursor)
    }

    /// Session settings the cursor sends with each request.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn server_info(&self) -> Result<ServerInfo> {
        let url = self.endpoint("v1/info")?;
        let response = self
            .with_session_headers(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| TrinoError::connection(format!("Cannot reach coordinator at {url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TrinoError::connection(format!(
                "Coordinator rejected user '{}' ({status})",
                self.config.resolved_user()
            )));
        }
        if !status.is_success() {
            return Err(TrinoError::connection(format!(
                "Coordinator at {url} answered {status}"
            )));
        }

        response
            .json::<ServerInfo>()
            .await
            .map_err(|e| TrinoError::connection(format!("Unexpected /v1/info response: {e}")))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TrinoError::internal(format!("Invalid endpoint {path}: {e}")))
    }

    fn with_session_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request
            .header(HEADER_USER, self.config.resolved_user())
            .header(HEADER_SOURCE, self.config.resolved_source());
        if let Some(catalog) = &self.config.catalog {
            request = request.header(HEADER_CATALOG, catalog);
        }
        if let Some(schema) = &self.config.schema {
            request = request.header(HEADER_SCHEMA, schema);
        }
        request
    }

    /// Sends one protocol request and decodes the `QueryResults` document.
    async fn send(&self, request: RequestBuilder) -> Result<QueryResults> {
        let response = request
            .send()
            .await
            .map_err(|e| TrinoError::connection(format!("Request to coordinator failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TrinoError::connection(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(TrinoError::Query(EngineError::new(format!(
                "Coordinator answered {status}: {}",
                body.trim()
            ))));
        }

        serde_json::from_str(&body)
            .map_err(|e| TrinoError::internal(format!("Failed to parse query results: {e}")))
    }

    /// Posts the statement and records its first `nextUri`.
    ///
    /// Runs on its own task so an abandoned `execute` still learns where the
    /// statement lives. If the statement was cancelled, or superseded by a
    /// newer `execute`, while the POST was pending it is deleted here.
    async fn submit(self, sql: String, generation: u64) -> Result<QueryResults> {
        let url = self.endpoint("v1/statement")?;
        debug!("Submitting statement to {url}");
        let posted = self
            .send(self.with_session_headers(self.client.post(url)).body(sql))
            .await;

        let mut page = {
            let mut slot = self.statement.lock().await;
            let current = slot.generation == generation;
            if current {
                slot.submitting = false;
            }
            let page = posted?;
            if current && !slot.cancelled {
                slot.next_uri.clone_from(&page.next_uri);
                return Ok(page);
            }
            page
        };

        if let Some(uri) = page.next_uri.take() {
            debug!("Statement {} was cancelled during submission, releasing it", page.id);
            if let Err(e) = self.delete(&uri).await {
                warn!("Failed to release cancelled statement {}: {e}", page.id);
            }
        }
        Err(TrinoError::Cancelled)
    }

    async fn delete(&self, uri: &str) -> Result<()> {
        let response = self
            .with_session_headers(self.client.delete(uri))
            .send()
            .await
            .map_err(|e| TrinoError::connection(format!("Cancel request failed: {e}")))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::GONE {
            Ok(())
        } else {
            Err(TrinoError::internal(format!("Cancel request answered {status}")))
        }
    }
}

#[async_trait]
impl Cursor for TrinoCursor {
    async fn execute(&self, sql: &str) -> Result<StatementOutput> {
        let generation = {
            let mut slot = self.statement.lock().await;
            slot.generation += 1;
            slot.submitting = true;
            slot.cancelled = false;
            slot.next_uri = None;
            slot.generation
        };

        let submission = tokio::spawn(self.clone().submit(sql.to_string(), generation));
        let mut page = submission
            .await
            .map_err(|e| TrinoError::internal(format!("Statement submission failed: {e}")))??;

        let mut output = StatementOutput {
            query_id: Some(page.id.clone()),
            ..Default::default()
        };

        loop {
            if let Some(error) = page.error.take() {
                self.statement.lock().await.next_uri = None;
                return Err(TrinoError::Query(error.into_engine_error(&page.id)));
            }

            if output.columns.is_empty() {
                if let Some(columns) = page.columns.take() {
                    output.columns = columns
                        .into_iter()
                        .map(|c| ColumnInfo::new(c.name, c.type_name))
                        .collect();
                }
            }

            if let Some(data) = page.data.take() {
                output
                    .rows
                    .extend(data.into_iter().map(|row| decode_row(row, &output.columns)));
            }

            let next = page.next_uri.take();
            let cancelled = {
                let mut slot = self.statement.lock().await;
                if slot.cancelled {
                    slot.next_uri = None;
                } else {
                    slot.next_uri.clone_from(&next);
                }
                slot.cancelled
            };

            if cancelled {
                if let Some(uri) = next {
                    debug!("Releasing page {uri} of cancelled query {}", page.id);
                    if let Err(e) = self.delete(&uri).await {
                        warn!("Failed to release cancelled statement {}: {e}", page.id);
                    }
                }
                return Err(TrinoError::Cancelled);
            }

            match next {
                Some(uri) => {
                    debug!(
                        "Query {} is {}, fetching next page",
                        page.id,
                        page.stats.as_ref().map_or("UNKNOWN", |s| s.state.as_str())
                    );
                    page = self
                        .send(self.with_session_headers(self.client.get(&uri)))
                        .await?;
                }
                None => break,
            }
        }

        debug!(
            "Query {} finished with {} rows",
            output.query_id.as_deref().unwrap_or("?"),
            output.rows.len()
        );
        Ok(output)
    }

    async fn cancel(&self) -> Result<()> {
        let (uri, submitting) = {
            let mut slot = self.statement.lock().await;
            slot.cancelled = true;
            (slot.next_uri.take(), slot.submitting)
        };

        match uri {
            Some(uri) => {
                debug!("Cancelling statement at {uri}");
                self.delete(&uri).await
            }
            None if submitting => {
                debug!("Cancel requested while the statement is being submitted");
                Ok(())
            }
            None => Err(TrinoError::internal("No statement in flight")),
        }
    }

    async fn close(&self) -> Result<()> {
        let uri = {
            let mut slot = self.statement.lock().await;
            if slot.submitting {
                // The submission task releases the statement once it is accepted.
                slot.cancelled = true;
            }
            slot.next_uri.take()
        };
        if let Some(uri) = uri {
            debug!("Releasing unfinished statement at {uri}");
            if let Err(e) = self.delete(&uri).await {
                warn!("Failed to release statement: {e}");
            }
        }
        Ok(())
    }
}

/// Converts one protocol row using the column types seen so far.
fn decode_row(row: Vec<serde_json::Value>, columns: &[ColumnInfo]) -> Row {
    row.into_iter()
        .enumerate()
        .map(|(i, cell)| decode_cell(cell, columns.get(i).map(|c| c.data_type.as_str())))
        .collect()
}

/// Converts one JSON cell. Binary data arrives base64 encoded and special
/// floating point values arrive as strings.
fn decode_cell(cell: serde_json::Value, type_name: Option<&str>) -> Value {
    let base = type_name
        .map(|t| t.split('(').next().unwrap_or(t).trim().to_ascii_lowercase())
        .unwrap_or_default();

    match (base.as_str(), cell) {
        (_, serde_json::Value::Null) => Value::Null,
        ("varbinary", serde_json::Value::String(encoded)) => {
            match base64::engine::general_purpose::STANDARD.decode(&encoded) {
                Ok(bytes) => Value::Bytes(bytes),
                Err(_) => Value::String(encoded),
            }
        }
        ("double" | "real", serde_json::Value::String(special)) => match special.as_str() {
            "NaN" => Value::Float(f64::NAN),
            "Infinity" => Value::Float(f64::INFINITY),
            "-Infinity" => Value::Float(f64::NEG_INFINITY),
            _ => Value::String(special),
        },
        ("double" | "real", serde_json::Value::Number(n)) => {
            n.as_f64().map_or(Value::Null, Value::Float)
        }
        (_, other) => Value::from_json(other),
    }
}

// Trino protocol types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    id: String,
    next_uri: Option<String>,
    columns: Option<Vec<ProtocolColumn>>,
    data: Option<Vec<Vec<serde_json::Value>>>,
    stats: Option<StatementStats>,
    error: Option<QueryErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct ProtocolColumn {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

#[derive(Debug, Deserialize)]
struct StatementStats {
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryErrorPayload {
    message: String,
    error_code: Option<i64>,
    error_name: Option<String>,
    error_type: Option<String>,
}

impl QueryErrorPayload {
    fn into_engine_error(self, query_id: &str) -> EngineError {
        EngineError {
            message: self.message,
            error_name: self.error_name,
            error_code: self.error_code,
            error_type: self.error_type,
            query_id: Some(query_id.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfo {
    node_version: NodeVersion,
    #[serde(default)]
    starting: bool,
}

#[derive(Debug, Deserialize)]
struct NodeVersion {
    version: String,
}
