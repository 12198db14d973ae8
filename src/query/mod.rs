//! Query execution lifecycle.
//!
//! This module tracks one statement from submission to a terminal state and
//! coordinates cancellation against the in-flight engine call.

pub mod executor;
mod state;

pub use executor::{Query, QueryHandle};
pub use state::QueryState;
