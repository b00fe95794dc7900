use super::*;
use std::net::TcpListener;

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn settings(ssh: Option<SshTunnelConfig>) -> DatabaseSettings {
    DatabaseSettings {
        mysql: MySqlConfig::new("db.internal").database("shop_test"),
        ssh,
    }
}

#[tokio::test]
async fn test_connect_without_ssh_host_is_skipped() {
    let mysql = MySqlConfig::new("127.0.0.1").port(closed_port());
    let connection = connect(None, &mysql, TypeCaster::standard()).await.unwrap();
    assert!(connection.is_none());
}

#[tokio::test]
async fn test_connect_raw_reports_unreachable_server() {
    let mysql = MySqlConfig::new("127.0.0.1").port(closed_port());
    let err = connect_raw(&mysql, TypeCaster::standard()).await.unwrap_err();
    assert!(err.is_connection_error());
}

#[test]
fn test_factory_description() {
    let direct = MySqlConnectionFactory::new(settings(None), TypeCaster::standard());
    assert_eq!(direct.describe(), "MySQL shop_test");

    let tunneled = MySqlConnectionFactory::new(
        settings(Some(SshTunnelConfig::with_agent("bastion.example.com", "deploy"))),
        TypeCaster::standard(),
    );
    assert_eq!(tunneled.describe(), "MySQL shop_test via bastion.example.com");
}

#[tokio::test]
async fn test_open_database_gives_up_after_policy() {
    let settings = DatabaseSettings {
        mysql: MySqlConfig::new("127.0.0.1").port(closed_port()),
        ssh: None,
    };
    let policy = RetryPolicy::new(1, sqlproc_connection::BackoffStrategy::constant(5));

    let err = open_database(settings, policy).await.unwrap_err();
    assert!(err.is_connection_error());
}

#[tokio::test]
async fn test_open_database_validates_settings() {
    let settings = DatabaseSettings {
        mysql: MySqlConfig::new(""),
        ssh: None,
    };
    assert!(open_database(settings, RetryPolicy::no_retry()).await.is_err());
}
