//! Typed schema and table conversion through the public API.

use std::sync::Arc;

use chrono::NaiveDate;
use trino_query::engine::{MockConnector, MockCursor};
use trino_query::result::{ColumnInfo, TimeUnit};
use trino_query::{Session, SessionConfig, TrinoError, Value, ValueType};

fn session_returning(columns: Vec<ColumnInfo>, rows: Vec<Vec<Value>>) -> Session {
    let cursor = Arc::new(MockCursor::new().with_result(columns, rows));
    Session::with_env_lookup(
        SessionConfig::default(),
        Arc::new(MockConnector::new(cursor)),
        |_| None,
    )
}

#[tokio::test]
async fn test_typed_schema_and_table_for_mixed_columns() {
    let session = session_returning(
        vec![
            ColumnInfo::new("id", "bigint"),
            ColumnInfo::new("price", "decimal(10,2)"),
            ColumnInfo::new("created", "timestamp(6) with time zone"),
            ColumnInfo::new("tags", "array(varchar)"),
        ],
        vec![
            vec![
                Value::Int(1),
                Value::from("9.99"),
                Value::from("2024-03-05 12:30:00.000000 UTC"),
                Value::Json(serde_json::json!(["a", "b"])),
            ],
            vec![Value::Int(2), Value::Null, Value::from("yesterday"), Value::Null],
        ],
    );

    let result = session.execute_query("SELECT * FROM orders").await.unwrap();

    let typed = result.typed_schema().unwrap();
    assert_eq!(typed["id"], ValueType::Int64);
    assert_eq!(typed["price"], ValueType::Decimal { precision: 10, scale: 2 });
    assert_eq!(
        typed["created"],
        ValueType::Timestamp {
            unit: TimeUnit::Microsecond,
            with_time_zone: true
        }
    );
    assert_eq!(typed["tags"], ValueType::List(Box::new(ValueType::Utf8)));

    let table = result.to_table();
    assert_eq!(table.num_rows(), 2);
    assert_eq!(table.num_columns(), 4);
    let created = NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap();
    assert_eq!(
        table.column("created").unwrap().values,
        vec![Value::Timestamp(created), Value::Null]
    );
    assert_eq!(
        table.column("price").unwrap().values,
        vec![Value::from("9.99"), Value::Null]
    );
}

#[tokio::test]
async fn test_unknown_type_fails_only_typed_schema() {
    let session = session_returning(
        vec![
            ColumnInfo::new("n", "integer"),
            ColumnInfo::new("shape", "geometry"),
        ],
        vec![vec![Value::Int(1), Value::from("POINT (1 2)")]],
    );

    let result = session.execute_query("SELECT n, shape FROM places").await.unwrap();

    assert!(matches!(
        result.typed_schema(),
        Err(TrinoError::UnsupportedType(name)) if name == "geometry"
    ));
    assert_eq!(result.schema()["shape"], "geometry");

    let table = result.to_table();
    assert_eq!(
        table.column("shape").unwrap().values,
        vec![Value::from("POINT (1 2)")]
    );
}

#[tokio::test]
async fn test_duplicate_names_keep_positions_but_last_wins_by_name() {
    let session = session_returning(
        vec![ColumnInfo::new("x", "integer"), ColumnInfo::new("x", "varchar")],
        vec![vec![Value::Int(1), Value::from("one")]],
    );

    let result = session.execute_query("SELECT 1 AS x, 'one' AS x").await.unwrap();

    assert_eq!(result.column_names(), vec!["x", "x"]);
    assert_eq!(result.schema().len(), 1);
    assert_eq!(result.schema()["x"], "varchar");
    assert_eq!(result.typed_schema().unwrap()["x"], ValueType::Utf8);

    let table = result.to_table();
    assert_eq!(table.num_columns(), 2);
    assert_eq!(table.columns()[0].values, vec![Value::Int(1)]);
    assert_eq!(table.column("x").unwrap().values, vec![Value::from("one")]);
}
