//! Logging configuration for trino-query.
//!
//! The library only emits `tracing` events; the binary decides where they go.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Initializes logging to stderr so stdout stays reserved for query output.
pub fn init_stderr_logging(verbose: bool) {
    let default = if verbose { "debug" } else { DEFAULT_FILTER };

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(default))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Builds the filter from `RUST_LOG`, falling back to the given directive.
fn build_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
