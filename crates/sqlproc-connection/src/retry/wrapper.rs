//! Connection wrapper that reconnects after the link is lost

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use sqlproc_core::{Connection, QueryResult, Result, SqlProcError, TypeCaster};
use tokio::sync::Mutex;

use super::{ConnectionFactory, RetryPolicy, connect_with_retry};

/// A [`Connection`] that replaces its inner connection when a statement fails
/// with a connection-class error.
///
/// The failed statement is returned as an error unless the policy enables
/// statement replay. Non-connection errors pass through untouched.
pub struct ReconnectingConnection {
    inner: Mutex<Arc<dyn Connection>>,
    factory: Arc<dyn ConnectionFactory>,
    policy: RetryPolicy,
    driver_name: String,
    database_name: Option<String>,
    caster: TypeCaster,
    consecutive_failures: AtomicU32,
    closed: AtomicBool,
}

impl ReconnectingConnection {
    /// Connect through `factory`, retrying per `policy`.
    pub async fn new(factory: Arc<dyn ConnectionFactory>, policy: RetryPolicy) -> Result<Arc<Self>> {
        let connection = connect_with_retry(factory.as_ref(), &policy).await?;
        Ok(Self::wrap(connection, factory, policy))
    }

    /// Wrap an already established connection.
    pub fn wrap(
        connection: Arc<dyn Connection>,
        factory: Arc<dyn ConnectionFactory>,
        policy: RetryPolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            driver_name: connection.driver_name().to_string(),
            database_name: connection.database_name().map(str::to_string),
            caster: connection.type_caster().clone(),
            inner: Mutex::new(connection),
            factory,
            policy,
            consecutive_failures: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Failed statements since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    async fn current(&self) -> Arc<dyn Connection> {
        self.inner.lock().await.clone()
    }

    /// Replace `failed` with a fresh connection. If another caller already
    /// replaced it, that connection is returned instead.
    async fn reconnect(&self, failed: &Arc<dyn Connection>) -> Result<Arc<dyn Connection>> {
        let mut inner = self.inner.lock().await;
        if !Arc::ptr_eq(&*inner, failed) {
            return Ok(inner.clone());
        }

        if let Err(e) = failed.close().await {
            tracing::debug!(error = %e, "closing lost connection failed");
        }

        let fresh = connect_with_retry(self.factory.as_ref(), &self.policy).await?;
        tracing::info!(
            database = self.database_name.as_deref().unwrap_or_default(),
            "reconnected"
        );
        *inner = fresh.clone();
        Ok(fresh)
    }
}

impl std::fmt::Debug for ReconnectingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectingConnection")
            .field("driver_name", &self.driver_name)
            .field("database_name", &self.database_name)
            .field("policy", &self.policy)
            .field("consecutive_failures", &self.consecutive_failures())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl Connection for ReconnectingConnection {
    fn driver_name(&self) -> &str {
        &self.driver_name
    }

    fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    fn type_caster(&self) -> &TypeCaster {
        &self.caster
    }

    async fn query(&self, sql: &str) -> Result<QueryResult> {
        if self.is_closed() {
            return Err(SqlProcError::Connection(
                "connection has been closed".to_string(),
            ));
        }

        let connection = self.current().await;
        let err = match connection.query(sql).await {
            Ok(result) => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
                return Ok(result);
            }
            Err(err) => err,
        };

        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if !err.is_connection_error() {
            return Err(err);
        }

        tracing::warn!(
            error = %err,
            consecutive_failures = failures,
            "connection lost, reconnecting"
        );
        let fresh = match self.reconnect(&connection).await {
            Ok(fresh) => fresh,
            Err(reconnect_err) => {
                tracing::error!(error = %reconnect_err, "reconnect failed");
                return Err(err);
            }
        };

        if !self.policy.replay_statements() {
            return Err(err);
        }

        let result = fresh.query(sql).await?;
        self.consecutive_failures.store(0, Ordering::SeqCst);
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.current().await.close().await
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
