//! sqlproc core - stored procedure calls over a single database connection
//!
//! This crate holds everything that does not depend on a particular driver:
//!
//! - `CallArgument` / `RawArgument` - values a procedure can be called with
//! - `marshal` - turns arguments into an injection-safe literal list
//! - `TypeCaster` - the column cast rules applied to every value read
//! - `Connection` - trait implemented by drivers
//! - `Database` - `invoke`, `invoke_all`, `raw_query` and `empty_test_database`
//! - `ProcedureCatalog` - procedure definition files on disk
//! - `DatabaseSettings` - MySQL and SSH settings from the environment or TOML

mod argument;
pub mod cast;
mod catalog;
mod config;
mod connection;
mod database;
mod error;
mod marshal;
mod types;

pub use argument::*;
pub use cast::{ColumnCastRule, FieldInfo, RawField, TypeCaster};
pub use catalog::*;
pub use config::*;
pub use connection::*;
pub use database::*;
pub use error::*;
pub use marshal::*;
pub use types::*;
