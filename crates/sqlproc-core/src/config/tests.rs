use super::*;
use indoc::indoc;
use std::path::PathBuf;

#[test]
fn test_mysql_from_lookup() {
    let config = MySqlConfig::from_lookup(|key| match key {
        "MYSQL_HOST" => Some("db.internal".into()),
        "MYSQL_USER" => Some("app".into()),
        "MYSQL_PASSWORD" => Some("".into()),
        "MYSQL_DATABASE_NAME" => Some("shop_test".into()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.host, "db.internal");
    assert_eq!(config.port, DEFAULT_MYSQL_PORT);
    assert_eq!(config.user.as_deref(), Some("app"));
    assert_eq!(config.password.as_deref(), Some(""));
    assert_eq!(config.database.as_deref(), Some("shop_test"));
    assert_eq!(config.display_name(), "shop_test");
}

#[test]
fn test_mysql_from_lookup_requires_host() {
    let err = MySqlConfig::from_lookup(|_| None).unwrap_err();
    assert!(err.to_string().contains("MYSQL_HOST"));
}

#[test]
fn test_mysql_validation() {
    assert!(MySqlConfig::new("").validate().is_err());
    assert!(MySqlConfig::new("localhost").port(0).validate().is_err());
    assert!(MySqlConfig::new("localhost").validate().is_ok());
}

#[test]
fn test_settings_from_toml() {
    let settings = DatabaseSettings::from_toml_str(indoc! {r#"
        [mysql]
        host = "127.0.0.1"
        user = "root"
        database = "app_test"

        [ssh]
        host = "bastion.example.com"
        username = "deploy"
        keepalive_seconds = 15

        [ssh.auth]
        type = "private_key"
        path = "/home/deploy/.ssh/id_ed25519"
    "#})
    .unwrap();

    assert_eq!(settings.mysql.port, 3306);
    assert_eq!(settings.mysql.database.as_deref(), Some("app_test"));

    let ssh = settings.ssh.unwrap();
    assert_eq!(ssh.port, DEFAULT_SSH_PORT);
    assert_eq!(ssh.keepalive_seconds, 15);
    assert_eq!(
        ssh.auth,
        SshAuthMethod::PrivateKey {
            path: PathBuf::from("/home/deploy/.ssh/id_ed25519"),
            passphrase: None,
        }
    );
}

#[test]
fn test_settings_from_toml_without_ssh() {
    let settings = DatabaseSettings::from_toml_str("[mysql]\nhost = \"localhost\"\n").unwrap();
    assert!(settings.ssh.is_none());
}

#[test]
fn test_settings_from_toml_rejects_invalid() {
    let err = DatabaseSettings::from_toml_str("[mysql]\nhost = \"\"\n").unwrap_err();
    assert!(matches!(err, SqlProcError::Configuration(_)));

    let err = DatabaseSettings::from_toml_str("not toml at all [").unwrap_err();
    assert!(matches!(err, SqlProcError::Serialization(_)));
}
