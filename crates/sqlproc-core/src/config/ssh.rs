//! SSH tunnel settings
//!
//! Describes the bastion host a database connection is tunneled through.

use crate::{Result, SqlProcError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Authentication method for SSH connections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SshAuthMethod {
    Password { password: String },
    PrivateKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
    /// Use the running SSH agent
    Agent,
}

impl SshAuthMethod {
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password {
            password: password.into(),
        }
    }

    pub fn private_key(path: impl Into<PathBuf>) -> Self {
        Self::PrivateKey {
            path: path.into(),
            passphrase: None,
        }
    }

    pub fn private_key_with_passphrase(
        path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self::PrivateKey {
            path: path.into(),
            passphrase: Some(passphrase.into()),
        }
    }
}

/// Where and how to open the SSH tunnel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SshTunnelConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub auth: SshAuthMethod,
    /// TCP connect and socket timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Keep-alive interval in seconds, 0 disables it
    #[serde(default)]
    pub keepalive_seconds: u32,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_timeout() -> u32 {
    30
}

impl SshTunnelConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, auth: SshAuthMethod) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            auth,
            timeout_seconds: default_timeout(),
            keepalive_seconds: 0,
        }
    }

    pub fn with_password(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(host, username, SshAuthMethod::password(password))
    }

    pub fn with_private_key(
        host: impl Into<String>,
        username: impl Into<String>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(host, username, SshAuthMethod::private_key(key_path))
    }

    pub fn with_agent(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self::new(host, username, SshAuthMethod::Agent)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn keepalive(mut self, seconds: u32) -> Self {
        self.keepalive_seconds = seconds;
        self
    }

    /// Read `SSH_HOST`, `SSH_PORT`, `SSH_USER` and `SSH_PASSWORD`.
    ///
    /// Returns `Ok(None)` when `SSH_HOST` is unset or empty, meaning the
    /// connection should not be tunneled.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`SshTunnelConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(host) = lookup("SSH_HOST").filter(|h| !h.is_empty()) else {
            return Ok(None);
        };

        let port = match lookup("SSH_PORT").filter(|p| !p.is_empty()) {
            Some(p) => p.parse::<u16>().map_err(|e| {
                SqlProcError::Configuration(format!("invalid SSH_PORT \"{}\": {}", p, e))
            })?,
            None => DEFAULT_SSH_PORT,
        };

        let username = lookup("SSH_USER").unwrap_or_default();
        let auth = match lookup("SSH_PASSWORD") {
            Some(password) => SshAuthMethod::password(password),
            None => SshAuthMethod::Agent,
        };

        Ok(Some(Self::new(host, username, auth).port(port)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(SqlProcError::Configuration(
                "SSH host cannot be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(SqlProcError::Configuration("SSH port cannot be 0".to_string()));
        }
        if self.username.is_empty() {
            return Err(SqlProcError::Configuration(
                "SSH username cannot be empty".to_string(),
            ));
        }
        if let SshAuthMethod::PrivateKey { path, .. } = &self.auth {
            if path.as_os_str().is_empty() {
                return Err(SqlProcError::Configuration(
                    "SSH private key path cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
