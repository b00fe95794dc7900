//! Connection settings
//!
//! Settings come from the environment (`MYSQL_*` and `SSH_*` variables) or
//! from a TOML document with a `[mysql]` table and an optional `[ssh]` table.

mod ssh;

pub use ssh::*;

use serde::{Deserialize, Serialize};

use crate::{Result, SqlProcError};

/// Default MySQL port
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// MySQL server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MySqlConfig {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Database to select after connecting
    #[serde(default)]
    pub database: Option<String>,
}

fn default_mysql_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

impl MySqlConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MYSQL_PORT,
            user: None,
            password: None,
            database: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Read `MYSQL_HOST`, `MYSQL_PORT`, `MYSQL_USER`, `MYSQL_PASSWORD` and
    /// `MYSQL_DATABASE_NAME`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`MySqlConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let host = non_empty("MYSQL_HOST").ok_or_else(|| {
            SqlProcError::Configuration("MYSQL_HOST is not set".to_string())
        })?;
        let port = match non_empty("MYSQL_PORT") {
            Some(p) => p.parse::<u16>().map_err(|e| {
                SqlProcError::Configuration(format!("invalid MYSQL_PORT \"{}\": {}", p, e))
            })?,
            None => DEFAULT_MYSQL_PORT,
        };

        Ok(Self {
            host,
            port,
            user: non_empty("MYSQL_USER"),
            password: lookup("MYSQL_PASSWORD"),
            database: non_empty("MYSQL_DATABASE_NAME"),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(SqlProcError::Configuration(
                "MySQL host cannot be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(SqlProcError::Configuration(
                "MySQL port cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Human-readable name of the target for log output
    pub fn display_name(&self) -> &str {
        self.database.as_deref().unwrap_or(&self.host)
    }
}

/// Everything needed to establish a connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    pub mysql: MySqlConfig,
    #[serde(default)]
    pub ssh: Option<SshTunnelConfig>,
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            mysql: MySqlConfig::from_env()?,
            ssh: SshTunnelConfig::from_env()?,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(text).map_err(|e| SqlProcError::Serialization(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.mysql.validate()?;
        if let Some(ssh) = &self.ssh {
            ssh.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
