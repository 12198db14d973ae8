//! Query lifecycle states.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a query.
///
/// Transitions only move forward: Pending → Running → one of Completed,
/// Error or Cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum QueryState {
    #[default]
    Pending = 0,
    Running = 1,
    Error = 2,
    Completed = 3,
    Cancelled = 4,
}

impl QueryState {
    /// Returns true for Completed, Error and Cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Error => "Error",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Error,
            3 => Self::Completed,
            _ => Self::Cancelled,
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`QueryState`] that the executing task and cancelling tasks update concurrently.
#[derive(Debug, Default)]
pub(crate) struct AtomicQueryState(AtomicU8);

impl AtomicQueryState {
    pub(crate) fn load(&self) -> QueryState {
        QueryState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from `from` to `to` if the current state is `from`.
    ///
    /// Returns the state actually found when the swap does not happen.
    pub(crate) fn transition(&self, from: QueryState, to: QueryState) -> Result<(), QueryState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(QueryState::from_u8)
    }
}
