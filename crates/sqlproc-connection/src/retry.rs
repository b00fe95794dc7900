//! Bounded retry with exponential backoff
//!
//! # Example
//!
//! ```ignore
//! use sqlproc_connection::retry::{BackoffStrategy, RetryPolicy, ReconnectingConnection};
//!
//! let policy = RetryPolicy::new(5, BackoffStrategy::new(250, 10_000));
//! let conn = ReconnectingConnection::new(factory, policy).await?;
//! let db = sqlproc_core::Database::new(conn);
//! ```

mod backoff;
mod policy;
mod wrapper;


pub use backoff::BackoffStrategy;
pub use policy::{ConnectionFactory, RetryPolicy, connect_with_retry, with_retry};
pub use wrapper::ReconnectingConnection;
