//! PostgreSQL integration tests for the record helpers
//!
//! Skipped unless POSTGRES_CONNECTION_STRING is set.

use recordkit::{
    Identifier, Record, RecordError, UpsertProps, get_by_id, insert_and_return,
    insert_if_not_exists, upsert, upsert_by_filter,
};
use serde_json::json;
use tokio_postgres::NoTls;

// Helper function to get PostgreSQL connection string from environment
fn get_postgres_connection_string() -> Option<String> {
    std::env::var("POSTGRES_CONNECTION_STRING").ok()
}

// Helper function to establish PostgreSQL connection for tests
async fn setup_postgres_connection() -> Option<tokio_postgres::Client> {
    let connection_string = get_postgres_connection_string()?;
    let (client, connection) = tokio_postgres::connect(&connection_string, NoTls)
        .await
        .ok()?;

    // Run the connection in the background
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("connection error: {e}");
        }
    });

    Some(client)
}

async fn setup_users_table(client: &tokio_postgres::Client, test_name: &str) -> String {
    // Unique table per test so tests can run in parallel against one database
    let table = format!("rk_users_{}", test_name.replace("test_", ""));

    let _ = client
        .execute(&format!("DROP TABLE IF EXISTS {table}"), &[])
        .await;
    client
        .execute(
            &format!(
                r#"
            CREATE TABLE {table} (
                id SERIAL PRIMARY KEY,
                email TEXT UNIQUE,
                name TEXT,
                score DOUBLE PRECISION,
                visits BIGINT,
                active BOOLEAN,
                meta JSONB
            )
            "#
            ),
            &[],
        )
        .await
        .expect("Failed to create users table");

    table
}

fn record(value: serde_json::Value) -> Record {
    value.as_object().unwrap().clone()
}

#[tokio::test]
async fn test_postgres_insert_if_not_exists() {
    let Some(client) = setup_postgres_connection().await else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };
    let table = setup_users_table(&client, "test_postgres_insert_if_not_exists").await;

    let data = record(json!({"email": "ann@example.com", "name": "Ann", "visits": 3}));
    let filter = record(json!({"email": "ann@example.com"}));

    let id = insert_if_not_exists(&client, &table, &data, &filter, Some("id"))
        .await
        .unwrap();
    assert_eq!(id, Identifier::Integer(1));

    let id = insert_if_not_exists(&client, &table, &data, &filter, Some("id"))
        .await
        .unwrap();
    assert_eq!(id, Identifier::ZERO);

    let row = get_by_id(&client, &table, 1_i64).await.unwrap().unwrap();
    assert_eq!(row.get("visits"), Some(&json!(3)));
    assert_eq!(row.get("score"), Some(&json!(null)));
}

#[tokio::test]
async fn test_postgres_insert_and_return_with_mixed_types() {
    let Some(client) = setup_postgres_connection().await else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };
    let table = setup_users_table(&client, "test_postgres_insert_and_return_with_mixed_types").await;

    let data = record(json!({
        "email": "bo@example.com",
        "name": "Bo",
        "score": 4.5,
        "active": true,
        "meta": {"tags": ["a", "b"]}
    }));
    let row = insert_and_return(&client, &table, &data)
        .await
        .unwrap()
        .unwrap();

    for (column, value) in &data {
        assert_eq!(row.get(column), Some(value), "column {column}");
    }
    assert_eq!(row.get("id"), Some(&json!(1)));
    assert!(get_by_id(&client, &table, 2_i64).await.unwrap().is_none());
}

#[tokio::test]
async fn test_postgres_upsert_both_variants() {
    let Some(client) = setup_postgres_connection().await else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };
    let table = setup_users_table(&client, "test_postgres_upsert_both_variants").await;

    let filter = record(json!({"email": "cy@example.com"}));
    let inserted = upsert(
        &client,
        UpsertProps {
            table: &table,
            data: &record(json!({"email": "cy@example.com", "name": "Cy"})),
            filter: &filter,
            return_record: true,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(inserted.get("id"), Some(&json!(1)));

    let updated = upsert(
        &client,
        UpsertProps {
            table: &table,
            data: &record(json!({"name": "Cyrus"})),
            filter: &filter,
            return_record: true,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.get("id"), Some(&json!(1)));
    assert_eq!(updated.get("name"), Some(&json!("Cyrus")));

    // Legacy variant: insert reports zero, update reports the matched id
    let legacy_filter = record(json!({"email": "di@example.com"}));
    let legacy_data = record(json!({"email": "di@example.com", "name": "Di"}));
    let id = upsert_by_filter(&client, &table, &legacy_data, &legacy_filter)
        .await
        .unwrap();
    assert_eq!(id, Identifier::ZERO);

    let id = upsert_by_filter(&client, &table, &record(json!({"score": 1.0})), &legacy_filter)
        .await
        .unwrap();
    assert_eq!(id, Identifier::Integer(2));
}

#[tokio::test]
async fn test_postgres_helpers_inside_caller_transaction() {
    let Some(mut client) = setup_postgres_connection().await else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };
    let table = setup_users_table(&client, "test_postgres_helpers_inside_caller_transaction").await;

    let data = record(json!({"email": "ed@example.com", "name": "Ed"}));
    {
        let transaction = client.transaction().await.unwrap();
        let id = insert_if_not_exists(&transaction, &table, &data, &data, None)
            .await
            .unwrap();
        assert_eq!(id, Identifier::Integer(1));
        transaction.rollback().await.unwrap();
    }
    assert!(get_by_id(&client, &table, 1_i64).await.unwrap().is_none());

    let transaction = client.transaction().await.unwrap();
    let row = insert_and_return(&transaction, &table, &data)
        .await
        .unwrap()
        .unwrap();
    transaction.commit().await.unwrap();
    let id = row.get("id").cloned().unwrap();
    assert!(get_by_id(&client, &table, Identifier::from_value(&id).unwrap())
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_postgres_errors_propagate_unchanged() {
    let Some(client) = setup_postgres_connection().await else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };
    let table = setup_users_table(&client, "test_postgres_errors_propagate_unchanged").await;

    let data = record(json!({"email": "dup@example.com"}));
    insert_and_return(&client, &table, &data).await.unwrap();

    // Unique violation from the database itself
    let err = insert_and_return(&client, &table, &data).await.unwrap_err();
    let pg_err = err
        .downcast_ref::<tokio_postgres::Error>()
        .expect("expected tokio_postgres::Error");
    assert_eq!(
        pg_err.code(),
        Some(&tokio_postgres::error::SqlState::UNIQUE_VIOLATION)
    );

    // Missing table
    let err = get_by_id(&client, "rk_table_that_does_not_exist", 1_i64)
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<tokio_postgres::Error>().is_some());

    // Value that cannot be converted to the column type
    let err = insert_and_return(&client, &table, &record(json!({"visits": "many"})))
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<tokio_postgres::Error>().is_some());

    // Rejected before reaching the server
    let err = get_by_id(&client, "bad name", 1_i64).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RecordError>(),
        Some(RecordError::InvalidIdentifier(_))
    ));
}

#[tokio::test]
async fn test_postgres_uuid_key_and_temporal_columns() {
    let Some(client) = setup_postgres_connection().await else {
        println!("Skipping PostgreSQL tests - POSTGRES_CONNECTION_STRING not set");
        return;
    };
    let table = "rk_events_uuid_key_and_temporal_columns";
    let _ = client
        .execute(&format!("DROP TABLE IF EXISTS {table}"), &[])
        .await;
    client
        .execute(
            &format!(
                r#"
            CREATE TABLE {table} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT,
                starts_at TIMESTAMP,
                day DATE,
                amount NUMERIC(10, 2),
                host INET
            )
            "#
            ),
            &[],
        )
        .await
        .expect("Failed to create events table");

    let data = record(json!({
        "title": "launch",
        "starts_at": "2024-01-02T03:04:05",
        "day": "2024-01-02",
        "amount": 12.5
    }));
    let row = insert_and_return(&client, table, &data)
        .await
        .unwrap()
        .expect("row written with a UUID key should be found again");

    let Some(serde_json::Value::String(key)) = row.get("id") else {
        panic!("expected the UUID key as text, got {:?}", row.get("id"));
    };
    assert_eq!(key.len(), 36);
    assert_eq!(row.get("starts_at"), Some(&json!("2024-01-02T03:04:05")));
    assert_eq!(row.get("day"), Some(&json!("2024-01-02")));
    assert_eq!(row.get("amount"), Some(&json!("12.50")));

    let fetched = get_by_id(&client, table, key.as_str()).await.unwrap().unwrap();
    assert_eq!(fetched, row);

    // Filters on the same columns bind as text too
    let id = insert_if_not_exists(&client, table, &data, &record(json!({"day": "2024-01-02"})), None)
        .await
        .unwrap();
    assert_eq!(id, Identifier::ZERO);

    // Column types with no JSON mapping are an error, not a made-up value
    client
        .execute(&format!("UPDATE {table} SET host = '10.0.0.1'"), &[])
        .await
        .unwrap();
    let err = get_by_id(&client, table, key.as_str()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RecordError>(),
        Some(RecordError::UnsupportedColumnType { .. })
    ));
}
