//! Tests against a running MySQL server
//!
//! Set `MYSQL_HOST` (and optionally `MYSQL_PORT`, `MYSQL_USER`,
//! `MYSQL_PASSWORD`, `MYSQL_DATABASE_NAME`) to run them; without it every test
//! returns early.

use sqlproc_connection::RetryPolicy;
use sqlproc_core::{CallArgument, Database, DatabaseSettings, MySqlConfig, Value};
use sqlproc_mysql::open_database;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn live_database() -> Option<Database> {
    init_tracing();
    let mysql = MySqlConfig::from_env().ok()?;
    let settings = DatabaseSettings { mysql, ssh: None };
    Some(
        open_database(settings, RetryPolicy::no_retry())
            .await
            .expect("MYSQL_HOST is set but the server is unreachable"),
    )
}

#[tokio::test]
async fn test_raw_query_normalizes_columns() {
    let Some(db) = live_database().await else {
        return;
    };

    let rows = db
        .raw_query(
            "SELECT CAST(1 AS DECIMAL(5,2)) AS price, \
             CAST('2024-03-09 10:11:12' AS DATETIME) AS created, \
             'text' AS label",
        )
        .await
        .unwrap();

    let row = &rows[0];
    assert_eq!(row.get_by_name("price"), Some(&Value::Float64(1.0)));
    assert!(matches!(row.get_by_name("created"), Some(Value::DateTimeUtc(_))));
    assert_eq!(row.get_by_name("label"), Some(&Value::String("text".into())));
}

#[tokio::test]
async fn test_invoke_round_trips_escaped_strings() {
    let Some(db) = live_database().await else {
        return;
    };

    db.raw_query("DROP PROCEDURE IF EXISTS sqlproc_echo").await.unwrap();
    db.raw_query("CREATE PROCEDURE sqlproc_echo(IN v VARCHAR(255)) SELECT v AS echoed")
        .await
        .unwrap();

    let tricky = "O'Brien \"quoted\" `tick` \\ back";
    let row = db
        .invoke("sqlproc_echo", &[CallArgument::from(tricky)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get_by_name("echoed"), Some(&Value::String(tricky.into())));

    db.raw_query("DROP PROCEDURE sqlproc_echo").await.unwrap();
}
