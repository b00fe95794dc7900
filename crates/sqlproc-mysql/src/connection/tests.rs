use super::*;
use std::net::TcpListener;

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn test_server_errors_are_execution_errors() {
    let err = query_error(mysql_async::Error::Server(mysql_async::ServerError {
        code: 1305,
        message: "PROCEDURE app.Nope does not exist".into(),
        state: "42000".into(),
    }));

    assert!(matches!(err, SqlProcError::Execution(ref m) if m.contains("does not exist")));
    assert!(!err.is_connection_error());
}

#[test]
fn test_transport_errors_are_connection_errors() {
    let io = mysql_async::Error::from(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    ));
    assert!(query_error(io).is_connection_error());

    let closed = mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed);
    assert!(query_error(closed).is_connection_error());
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let err = MySqlConnection::connect(&MySqlConfig::new(""), TypeCaster::standard())
        .await
        .unwrap_err();
    assert!(matches!(err, SqlProcError::Configuration(_)));
}

#[tokio::test]
async fn test_connect_to_unreachable_server_is_connection_error() {
    let config = MySqlConfig::new("127.0.0.1")
        .port(closed_port())
        .database("app_test");

    let err = MySqlConnection::connect(&config, TypeCaster::standard())
        .await
        .unwrap_err();
    assert!(err.is_connection_error(), "unexpected error: {err:?}");
}

struct RecordsDropThread(std::sync::Arc<parking_lot::Mutex<Option<std::thread::ThreadId>>>);

impl Drop for RecordsDropThread {
    fn drop(&mut self) {
        *self.0.lock() = Some(std::thread::current().id());
    }
}

#[tokio::test]
async fn test_drop_off_runtime_runs_on_blocking_pool() {
    let dropped_on = std::sync::Arc::new(parking_lot::Mutex::new(None));

    drop_off_runtime(RecordsDropThread(dropped_on.clone())).await;

    let thread = (*dropped_on.lock()).expect("value was dropped");
    assert_ne!(thread, std::thread::current().id());
}
