//! Stored procedure invocation over an established connection

use std::sync::Arc;

use crate::{
    CallArgument, Connection, ProcedureCatalog, RawArgument, Result, Row, SqlProcError, Value,
    call_statement, call_statement_raw,
};

/// Procedure that lists the statements needed to empty a test database
pub const TRUNCATE_COMMANDS_PROCEDURE: &str = "getTruncateCommands";

/// Column of [`TRUNCATE_COMMANDS_PROCEDURE`] rows holding the SQL text
pub const TRUNCATE_COMMAND_COLUMN: &str = "str";

/// Database names must contain this to be emptied
pub const TEST_DATABASE_MARKER: &str = "test";

/// Procedure calls and raw queries against one connection.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct Database {
    connection: Arc<dyn Connection>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.connection.driver_name())
            .field("database", &self.connection.database_name())
            .finish()
    }
}

impl Database {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Call a stored procedure and return the first row of its first result set.
    ///
    /// Procedures called this way are expected to produce at most one row of
    /// output. Any further rows or result sets are dropped; use
    /// [`Database::invoke_all`] when a procedure returns a list.
    ///
    /// Arguments are marshalled before anything is sent. An argument without a
    /// SQL literal fails the call with [`SqlProcError::Marshal`] and the
    /// connection is never touched.
    ///
    /// The procedure name is written into the statement as-is and must not come
    /// from untrusted input.
    pub async fn invoke(&self, procedure: &str, args: &[CallArgument]) -> Result<Option<Row>> {
        let sql = call_statement(procedure, args)?;
        let rows = self.run_call(procedure, &sql).await?;
        Ok(rows.into_iter().next())
    }

    /// [`Database::invoke`] for arguments from a dynamic source.
    pub async fn invoke_raw(&self, procedure: &str, args: &[RawArgument]) -> Result<Option<Row>> {
        let sql = call_statement_raw(procedure, args)?;
        let rows = self.run_call(procedure, &sql).await?;
        Ok(rows.into_iter().next())
    }

    /// Call a stored procedure and return every row of its first result set.
    pub async fn invoke_all(&self, procedure: &str, args: &[CallArgument]) -> Result<Vec<Row>> {
        let sql = call_statement(procedure, args)?;
        self.run_call(procedure, &sql).await
    }

    /// Run SQL text without marshalling or escaping and return the rows of its
    /// first result set.
    ///
    /// This is a trust boundary: only static SQL written by the application may
    /// be passed here. Never build `sql` from user input; call a procedure with
    /// [`Database::invoke`] instead.
    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    pub async fn raw_query(&self, sql: &str) -> Result<Vec<Row>> {
        let result = self.connection.query(sql).await?;
        Ok(result.into_first_set_rows())
    }

    /// Truncate every table of a test database.
    ///
    /// Refuses with [`SqlProcError::Configuration`] before running anything
    /// unless the connected database's name contains `test`. Otherwise runs
    /// each statement returned by `getTruncateCommands()` in order and stops at
    /// the first failure. Returns the number of statements run.
    pub async fn empty_test_database(&self) -> Result<usize> {
        let database = self.connection.database_name().unwrap_or_default();
        if !database.contains(TEST_DATABASE_MARKER) {
            tracing::error!(database = %database, "refusing to truncate a non-test database");
            return Err(SqlProcError::Configuration(format!(
                "refusing to truncate non-test database \"{}\"",
                database
            )));
        }

        let commands = self.invoke_all(TRUNCATE_COMMANDS_PROCEDURE, &[]).await?;
        tracing::info!(database = %database, commands = commands.len(), "emptying test database");

        for (idx, row) in commands.iter().enumerate() {
            let sql = match row.get_by_name(TRUNCATE_COMMAND_COLUMN) {
                Some(Value::String(sql)) => sql,
                other => {
                    return Err(SqlProcError::Execution(format!(
                        "{} row {} has no SQL text in column \"{}\" (got {:?})",
                        TRUNCATE_COMMANDS_PROCEDURE, idx, TRUNCATE_COMMAND_COLUMN, other
                    )));
                }
            };
            self.raw_query(sql).await?;
        }

        Ok(commands.len())
    }

    /// Create every procedure in the catalog. Returns how many were installed.
    pub async fn install_procedures(&self, catalog: &ProcedureCatalog) -> Result<usize> {
        for procedure in catalog.iter() {
            tracing::debug!(procedure = %procedure.name, path = %procedure.path.display(), "installing procedure");
            self.raw_query(&procedure.definition).await?;
        }
        tracing::info!(count = catalog.len(), "procedures installed");
        Ok(catalog.len())
    }

    #[tracing::instrument(skip(self, sql), fields(procedure = %procedure))]
    async fn run_call(&self, procedure: &str, sql: &str) -> Result<Vec<Row>> {
        let result = self.connection.query(sql).await?;
        let rows = result.into_first_set_rows();
        tracing::debug!(row_count = rows.len(), "procedure returned");
        Ok(rows)
    }
}
