//! Integration tests for trino-query.

pub mod fake_coordinator;
pub mod live_test;
pub mod protocol_test;
pub mod result_test;
