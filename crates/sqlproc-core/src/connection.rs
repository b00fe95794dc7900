//! Connection trait

use crate::{QueryResult, Result, TypeCaster};
use async_trait::async_trait;

/// An established database connection.
///
/// Implementations run one statement at a time and pass every column value
/// through their [`TypeCaster`] before building rows.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g. "mysql")
    fn driver_name(&self) -> &str;

    /// Name of the database the connection is using, if one was selected
    fn database_name(&self) -> Option<&str>;

    /// Rules applied to every value read on this connection
    fn type_caster(&self) -> &TypeCaster;

    /// Run SQL text as-is and collect every result set it produces.
    async fn query(&self, sql: &str) -> Result<QueryResult>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
