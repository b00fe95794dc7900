//! MySQL connection implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row as MySqlRow, prelude::*};
use parking_lot::Mutex;
use sqlproc_core::{
    Connection, MySqlConfig, QueryResult, Result, SqlProcError, SshTunnelConfig, TypeCaster,
};

use crate::decode::decode_result_set;
use crate::ssh::{SshTunnel, TunnelTarget};

const TUNNEL_HOST: &str = "127.0.0.1";

/// A single MySQL session, optionally reached through an SSH tunnel.
///
/// The pool is held at exactly one connection, so statements run one at a
/// time on the same server session.
pub struct MySqlConnection {
    pool: Pool,
    database_name: Option<String>,
    caster: TypeCaster,
    closed: AtomicBool,
    /// Kept alive for as long as the pool may use it
    tunnel: Mutex<Option<SshTunnel>>,
}

impl MySqlConnection {
    /// Connect directly over TCP.
    pub async fn connect(config: &MySqlConfig, caster: TypeCaster) -> Result<Self> {
        config.validate()?;
        let name = config.display_name().to_string();
        tracing::info!(host = %config.host, port = config.port, "Connecting to {} MySQL database", name);

        match Self::open(config, caster).await {
            Ok(connection) => {
                tracing::info!("Connected successfully to {} MySQL database", name);
                Ok(connection)
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not connect to database {}", name);
                Err(e)
            }
        }
    }

    /// Open an SSH tunnel to the bastion and connect through it.
    ///
    /// `mysql.host` and `mysql.port` are resolved by the bastion, not locally.
    pub async fn connect_tunneled(
        ssh: &SshTunnelConfig,
        mysql: &MySqlConfig,
        caster: TypeCaster,
    ) -> Result<Self> {
        mysql.validate()?;
        let target = TunnelTarget {
            host: mysql.host.clone(),
            port: mysql.port,
        };
        let ssh_config = ssh.clone();

        let tunnel = tokio::task::spawn_blocking(move || SshTunnel::open(&ssh_config, target))
            .await
            .map_err(|e| SqlProcError::Connection(format!("SSH tunnel task failed: {}", e)))?
            .map_err(|e| SqlProcError::Connection(format!("{:#}", e)))?;

        let local = MySqlConfig {
            host: TUNNEL_HOST.to_string(),
            port: tunnel.local_port(),
            ..mysql.clone()
        };
        match Self::connect(&local, caster).await {
            Ok(connection) => {
                *connection.tunnel.lock() = Some(tunnel);
                Ok(connection)
            }
            Err(e) => {
                drop_off_runtime(tunnel).await;
                Err(e)
            }
        }
    }

    async fn open(config: &MySqlConfig, caster: TypeCaster) -> Result<Self> {
        let mut opts_builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(config.host.as_str())
            .tcp_port(config.port)
            .db_name(config.database.as_deref())
            .user(config.user.as_deref())
            .pass(config.password.as_deref());

        let constraints = PoolConstraints::new(1, 1).ok_or_else(|| {
            SqlProcError::Connection("Failed to configure MySQL pool constraints (min=1, max=1)".into())
        })?;
        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_reset_connection(false);
        opts_builder = opts_builder.pool_opts(pool_opts);

        let pool = Pool::new(Opts::from(opts_builder));

        // resolves the session database and proves the server is reachable
        let mut conn = get_conn(&pool).await?;
        let selected: Option<(Option<String>,)> = conn
            .query_first("SELECT DATABASE()")
            .await
            .map_err(query_error)?;
        drop(conn);

        let database_name = config
            .database
            .clone()
            .or_else(|| selected.and_then(|(db,)| db));

        Ok(Self {
            pool,
            database_name,
            caster,
            closed: AtomicBool::new(false),
            tunnel: Mutex::new(None),
        })
    }

    /// Local port of the SSH tunnel, when connected through one
    pub fn tunnel_port(&self) -> Option<u16> {
        self.tunnel.lock().as_ref().map(SshTunnel::local_port)
    }
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("database_name", &self.database_name)
            .field("tunnel_port", &self.tunnel_port())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Drop `value` on the blocking pool. Closing a tunnel joins its acceptor
/// thread and disconnects the SSH session, which must not stall a runtime worker.
async fn drop_off_runtime<T: Send + 'static>(value: T) {
    let _ = tokio::task::spawn_blocking(move || drop(value)).await;
}

async fn get_conn(pool: &Pool) -> Result<Conn> {
    pool.get_conn()
        .await
        .map_err(|e| SqlProcError::Connection(format!("Failed to get MySQL connection: {}", e)))
}

/// Server-side failures are statement errors. Anything the driver or the
/// socket reports means the session itself is gone.
pub(crate) fn query_error(err: mysql_async::Error) -> SqlProcError {
    match err {
        mysql_async::Error::Server(e) => SqlProcError::Execution(e.to_string()),
        mysql_async::Error::Io(e) => SqlProcError::Connection(e.to_string()),
        mysql_async::Error::Driver(e) => SqlProcError::Connection(e.to_string()),
        other => SqlProcError::Execution(other.to_string()),
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    fn type_caster(&self) -> &TypeCaster {
        &self.caster
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str) -> Result<QueryResult> {
        if self.is_closed() {
            return Err(SqlProcError::Connection("connection is closed".into()));
        }
        let start_time = Instant::now();

        let mut conn = get_conn(&self.pool).await?;
        let mut result = conn.query_iter(sql).await.map_err(query_error)?;

        let mut result_sets = Vec::new();
        while !result.is_empty() {
            let columns = result.columns();
            let rows: Vec<MySqlRow> = result.collect().await.map_err(query_error)?;
            // status-only packets, such as the one ending a CALL, carry no columns
            if let Some(columns) = columns.filter(|c| !c.is_empty()) {
                result_sets.push(decode_result_set(&columns, rows, &self.caster));
            }
        }
        let affected_rows = result.affected_rows();
        drop(result);

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            result_sets = result_sets.len(),
            affected_rows,
            execution_time_ms,
            "query executed successfully"
        );

        Ok(QueryResult {
            result_sets,
            affected_rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(database = ?self.database_name, "closing MySQL connection");

        let disconnected = self
            .pool
            .clone()
            .disconnect()
            .await
            .map_err(|e| SqlProcError::Connection(format!("Failed to close MySQL connection: {}", e)));

        let tunnel = self.tunnel.lock().take();
        if let Some(tunnel) = tunnel {
            drop_off_runtime(tunnel).await;
        }
        disconnected
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests;
