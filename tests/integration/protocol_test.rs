//! Client protocol tests against the in-process fake coordinator.

use std::sync::Arc;

use chrono::NaiveDate;
use trino_query::engine::TrinoConnector;
use trino_query::{QueryState, Session, SessionConfig, TrinoError, Value};

use super::fake_coordinator::FakeCoordinator;

fn session_for(coordinator: &FakeCoordinator) -> Session {
    let config = SessionConfig::new(
        Some(coordinator.host()),
        Some(coordinator.port()),
        Some("analyst".to_string()),
        Some("memory".to_string()),
    );
    Session::with_env_lookup(config, Arc::new(TrinoConnector::new()), |_| None)
}

#[tokio::test]
async fn test_rows_are_collected_across_pages() {
    let coordinator = FakeCoordinator::start().await;
    let session = session_for(&coordinator);

    let result = session.execute_query("SELECT n, seen FROM t").await.unwrap();

    assert_eq!(result.query_id(), Some("q_rows"));
    assert_eq!(result.row_count(), 3);
    assert_eq!(result.column_names(), vec!["n", "seen"]);
    assert_eq!(result.schema()["seen"], "timestamp(3)");

    let table = result.to_table();
    let seen = &table.column("seen").unwrap().values;
    let midnight = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(
        seen,
        &vec![Value::Timestamp(midnight), Value::Null, Value::Null]
    );
    assert_eq!(
        table.column("n").unwrap().values,
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}

#[tokio::test]
async fn test_session_headers_are_sent() {
    let coordinator = FakeCoordinator::start().await;
    let session = session_for(&coordinator);

    session.execute_query("SELECT 1").await.unwrap();

    let posts = coordinator.requests_with_method("POST").await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].path, "/v1/statement");
    assert_eq!(posts[0].body, "SELECT 1");
    assert_eq!(posts[0].user.as_deref(), Some("analyst"));
    assert_eq!(posts[0].catalog.as_deref(), Some("memory"));
}

#[tokio::test]
async fn test_connect_checks_info_once_per_session() {
    let coordinator = FakeCoordinator::start().await;
    let session = session_for(&coordinator);

    session.execute_query("SELECT 1").await.unwrap();
    session.execute_query("SELECT 2").await.unwrap();

    let info_requests = coordinator
        .requests_with_method("GET")
        .await
        .into_iter()
        .filter(|r| r.path == "/v1/info")
        .count();
    assert_eq!(info_requests, 1);
    assert_eq!(coordinator.requests_with_method("POST").await.len(), 2);
}

#[tokio::test]
async fn test_engine_error_is_surfaced() {
    let coordinator = FakeCoordinator::start().await;
    let session = session_for(&coordinator);
    let mut query = session.create_query("SELECT * FROM missing").await.unwrap();

    let err = query.execute().await.unwrap_err();

    assert_eq!(query.state(), QueryState::Error);
    let engine = err.engine_error().unwrap();
    assert_eq!(engine.error_name.as_deref(), Some("TABLE_NOT_FOUND"));
    assert_eq!(engine.query_id.as_deref(), Some("q_missing"));
    assert!(engine.is_user_error());
}

#[tokio::test]
async fn test_cancel_deletes_statement_in_flight() {
    let coordinator = FakeCoordinator::start().await;
    let session = session_for(&coordinator);
    let mut query = session.create_query("SELECT slow()").await.unwrap();
    let handle = query.handle();

    let task = tokio::spawn(async move { query.execute().await });
    coordinator.wait_for_slow_page().await;
    handle.cancel().await;

    assert!(matches!(task.await.unwrap(), Err(TrinoError::Cancelled)));
    assert_eq!(handle.state(), QueryState::Cancelled);

    let deletes = coordinator.requests_with_method("DELETE").await;
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].path, "/v1/statement/executing/q_slow/1");
}

#[tokio::test]
async fn test_cancel_during_submission_releases_statement() {
    let coordinator = FakeCoordinator::start().await;
    let session = session_for(&coordinator);
    let mut query = session.create_query("SELECT delayed()").await.unwrap();
    let handle = query.handle();

    let task = tokio::spawn(async move { query.execute().await });
    coordinator.wait_for_delayed_post().await;
    handle.cancel().await;

    assert!(matches!(task.await.unwrap(), Err(TrinoError::Cancelled)));
    assert_eq!(handle.state(), QueryState::Cancelled);

    coordinator.release_delayed_post();
    let deletes = coordinator.wait_for_delete().await;
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].path, "/v1/statement/queued/q_delayed/1");

    let result = session.execute_query("SELECT n FROM t").await.unwrap();
    assert_eq!(result.row_count(), 3);
}

#[tokio::test]
async fn test_unreachable_coordinator_is_a_connection_error() {
    // Bind and drop to get a port nothing listens on.
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = SessionConfig::new(Some("127.0.0.1".to_string()), Some(port), None, None);
    let session = Session::with_env_lookup(config, Arc::new(TrinoConnector::new()), |_| None);

    let err = session.execute_query("SELECT 1").await.unwrap_err();
    assert!(matches!(err, TrinoError::Connection(_)));
    assert!(!session.is_connected());
}
