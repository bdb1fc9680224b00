//! # Connection Resource
//!
//! Narrow execute/query contract over a pooled database handle.
//!
//! - `Database` is the seam used by the catalog loader and the invoker
//! - `PgDatabase` is the Postgres implementation (bounded pool, search path hook)
//! - `MemoryDatabase` answers from scripted responses and records statements
//! - `RetryPolicy` drives the startup "wait for the database" loop

pub mod errors;
pub mod memory;
pub mod pg_types;
pub mod postgres;
pub mod retry;

use async_trait::async_trait;

use crate::value::Value;

pub use errors::{DbError, DbResult};
pub use memory::{MemoryDatabase, StatementKind, StatementRecord};
pub use postgres::PgDatabase;
pub use retry::{retry, RetryPolicy, Sleeper, TokioSleeper};

/// One result row: column values in select-list order
pub type Row = Vec<Value>;

/// Execute/query contract consumed by the core
///
/// Positional parameters are bound as `$1..$n` in order.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement and return the affected-row count
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64>;

    /// Run a query and consume every row
    ///
    /// A failure while reading any row aborts the remaining rows.
    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>>;
}
