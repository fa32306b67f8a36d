//! Physical connection seam
//!
//! The pool and mapper only ever talk to a database through these two
//! traits; the concrete driver lives in [`crate::sqlite`]. Statements are
//! always parameterized, never carrying caller data in the SQL text.

use crate::config::DatabaseConfig;
use crate::error::OrmResult;
use crate::value::{Row, SqlValue};
use async_trait::async_trait;

/// Outcome of a mutating statement
#[derive(Debug, Clone, Copy)]
pub struct ExecResult {
	pub rows_affected: u64,
	/// Database-generated key of the inserted row, when the driver
	/// reports one.
	pub last_insert_id: Option<i64>,
}

/// One exclusive physical database session
#[async_trait]
pub trait Connection: Send {
	async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> OrmResult<ExecResult>;

	async fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> OrmResult<Vec<Row>>;

	async fn fetch_optional(&mut self, sql: &str, params: &[SqlValue]) -> OrmResult<Option<Row>>;

	/// Close the session. Further calls on a closed connection fail with
	/// a connection error.
	async fn close(&mut self) -> OrmResult<()>;
}

/// Opens physical connections for the pool at construction time
#[async_trait]
pub trait Connector: Send + Sync {
	async fn open(&self) -> OrmResult<Box<dyn Connection>>;

	/// The configuration this connector opens against.
	fn config(&self) -> &DatabaseConfig;
}
