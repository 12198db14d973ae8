//! Tests against a real Trino coordinator.
//!
//! Set TRINO_TEST_URL (e.g. `trino://test@localhost:8080/memory/default`) to run them.

use trino_query::{QueryState, Session, SessionConfig, TrinoError, ValueType};

/// Helper to create a session for the test coordinator.
fn get_test_session() -> Option<Session> {
    let url = std::env::var("TRINO_TEST_URL").ok()?;
    let config = SessionConfig::from_connection_string(&url).ok()?;
    Some(Session::new(config))
}

#[tokio::test]
async fn test_live_select_literals() {
    let Some(session) = get_test_session() else {
        eprintln!("Skipping test: TRINO_TEST_URL not set");
        return;
    };

    let result = session
        .execute_query("SELECT 1 AS num, 'hello' AS greeting, TIMESTAMP '2024-01-01 10:00:00.123' AS ts")
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["num", "greeting", "ts"]);
    assert_eq!(result.row_count(), 1);
    assert!(result.query_id().is_some());

    let typed = result.typed_schema().unwrap();
    assert_eq!(typed["num"], ValueType::Int32);
    assert_eq!(typed["greeting"], ValueType::Utf8);

    let table = result.to_table();
    assert!(!table.column("ts").unwrap().values[0].is_null());
}

#[tokio::test]
async fn test_live_unknown_table() {
    let Some(session) = get_test_session() else {
        eprintln!("Skipping test: TRINO_TEST_URL not set");
        return;
    };

    let mut query = session
        .create_query("SELECT * FROM no_such_table_for_trino_query_tests")
        .await
        .unwrap();
    let err = query.execute().await.unwrap_err();

    assert_eq!(query.state(), QueryState::Error);
    assert!(matches!(err, TrinoError::Query(_)));
}
