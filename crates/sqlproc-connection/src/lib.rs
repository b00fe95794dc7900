//! sqlproc connection - connection establishment policy
//!
//! Connecting and reconnecting are retried a bounded number of times with
//! exponential backoff. Nothing here re-enters itself: every retry loop ends in
//! a `Result`.

pub mod retry;

pub use retry::{
    BackoffStrategy, ConnectionFactory, ReconnectingConnection, RetryPolicy, connect_with_retry,
    with_retry,
};
