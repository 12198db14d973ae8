//! Error types for trino-query.
//!
//! Defines the main error enum used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for trino-query operations.
#[derive(Error, Debug)]
pub enum TrinoError {
    /// The cursor could not be established (engine unreachable, principal rejected, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The engine rejected or failed the statement.
    #[error("Query error: {0}")]
    Query(EngineError),

    /// A column's engine type has no in-memory value type.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// The query was cancelled before it completed.
    #[error("Query cancelled")]
    Cancelled,

    /// Configuration errors (invalid config file, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, malformed engine responses, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrinoError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error carrying only a message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(EngineError::new(msg))
    }

    /// Creates an unsupported type error for the given engine type name.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType(type_name.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::UnsupportedType(_) => "Unsupported Type",
            Self::Cancelled => "Cancelled",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the engine error payload if this is a query error.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for TrinoError {
    fn from(e: EngineError) -> Self {
        Self::Query(e)
    }
}

/// Error detail reported by the engine for a failed statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    /// Human readable message.
    pub message: String,

    /// Symbolic error name, e.g. `SYNTAX_ERROR`.
    pub error_name: Option<String>,

    /// Numeric error code.
    pub error_code: Option<i64>,

    /// Error class, e.g. `USER_ERROR` or `INTERNAL_ERROR`.
    pub error_type: Option<String>,

    /// Id of the failed query, if the engine assigned one.
    pub query_id: Option<String>,
}

impl EngineError {
    /// Creates an engine error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Sets the symbolic error name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.error_name = Some(name.into());
        self
    }

    /// Sets the query id.
    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    /// Returns true if the engine classified this as a user error.
    pub fn is_user_error(&self) -> bool {
        self.error_type.as_deref() == Some("USER_ERROR")
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_name {
            Some(name) => write!(f, "{} ({})", self.message, name)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(id) = &self.query_id {
            write!(f, " [query {id}]")?;
        }
        Ok(())
    }
}

/// Result type alias using TrinoError.
pub type Result<T> = std::result::Result<T, TrinoError>;
