//! trino-query - query lifecycle management for Trino.
//!
//! A [`Session`] lazily opens one cursor and creates [`Query`] objects bound
//! to it. A query tracks its [`QueryState`], can be cancelled from another
//! task or by a process signal, and produces a [`ResultSet`] whose schema and
//! columnar [`Table`] are typed.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
pub mod result;
pub mod session;
pub mod signal;

pub use config::SessionConfig;
pub use error::{EngineError, Result, TrinoError};
pub use query::{Query, QueryHandle, QueryState};
pub use result::{ResultSet, Table, Value, ValueType};
pub use session::Session;
