//! Connection establishment
//!
//! `connect` goes through the configured SSH bastion, `connect_raw` dials the
//! server directly. `open_database` adds reconnection on top of either.

use std::sync::Arc;

use async_trait::async_trait;
use sqlproc_connection::{ConnectionFactory, ReconnectingConnection, RetryPolicy};
use sqlproc_core::{
    Connection, Database, DatabaseSettings, MySqlConfig, Result, SshTunnelConfig, TypeCaster,
};

use crate::MySqlConnection;

/// Connect through an SSH tunnel.
///
/// Returns `Ok(None)` without touching the network when no tunnel is
/// configured; use [`connect_raw`] for direct connections.
pub async fn connect(
    ssh: Option<&SshTunnelConfig>,
    mysql: &MySqlConfig,
    caster: TypeCaster,
) -> Result<Option<MySqlConnection>> {
    let Some(ssh) = ssh else {
        tracing::debug!(database = mysql.display_name(), "no SSH host configured, skipping tunneled connect");
        return Ok(None);
    };
    MySqlConnection::connect_tunneled(ssh, mysql, caster)
        .await
        .map(Some)
}

/// Connect directly over TCP.
pub async fn connect_raw(mysql: &MySqlConfig, caster: TypeCaster) -> Result<MySqlConnection> {
    MySqlConnection::connect(mysql, caster).await
}

/// Creates MySQL connections from fixed settings, tunneled when the settings
/// name an SSH host.
#[derive(Debug, Clone)]
pub struct MySqlConnectionFactory {
    settings: DatabaseSettings,
    caster: TypeCaster,
}

impl MySqlConnectionFactory {
    pub fn new(settings: DatabaseSettings, caster: TypeCaster) -> Self {
        Self { settings, caster }
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }
}

#[async_trait]
impl ConnectionFactory for MySqlConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        let connection = match &self.settings.ssh {
            Some(ssh) => {
                MySqlConnection::connect_tunneled(ssh, &self.settings.mysql, self.caster.clone())
                    .await?
            }
            None => connect_raw(&self.settings.mysql, self.caster.clone()).await?,
        };
        Ok(Arc::new(connection))
    }

    fn describe(&self) -> String {
        match &self.settings.ssh {
            Some(ssh) => format!(
                "MySQL {} via {}",
                self.settings.mysql.display_name(),
                ssh.host
            ),
            None => format!("MySQL {}", self.settings.mysql.display_name()),
        }
    }
}

/// Connect with the standard cast rules and wrap the connection so that it
/// reconnects after the link is lost.
pub async fn open_database(settings: DatabaseSettings, policy: RetryPolicy) -> Result<Database> {
    settings.validate()?;
    let factory = Arc::new(MySqlConnectionFactory::new(settings, TypeCaster::standard()));
    let connection = ReconnectingConnection::new(factory, policy).await?;
    Ok(Database::new(connection))
}

/// [`open_database`] with settings read from `MYSQL_*` and `SSH_*` variables.
pub async fn open_database_from_env(policy: RetryPolicy) -> Result<Database> {
    open_database(DatabaseSettings::from_env()?, policy).await
}

#[cfg(test)]
mod tests;
