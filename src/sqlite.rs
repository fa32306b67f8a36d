//! SQLite driver
//!
//! One [`SqliteConnection`] wraps one raw sqlx session; the pool owns a
//! fixed set of them. Values are bound positionally and rows are decoded
//! column by column into [`Row`], probing for NULL first because sqlite
//! reports weak column types.

use crate::config::DatabaseConfig;
use crate::connection::{Connection, Connector, ExecResult};
use crate::error::{OrmError, OrmResult};
use crate::value::{Row, SqlValue};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Row as SqlxRow, TypeInfo};
use std::str::FromStr;

/// Opens raw SQLite sessions from a [`DatabaseConfig`]
pub struct SqliteConnector {
	config: DatabaseConfig,
}

impl SqliteConnector {
	pub fn new(config: DatabaseConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl Connector for SqliteConnector {
	async fn open(&self) -> OrmResult<Box<dyn Connection>> {
		let options = SqliteConnectOptions::from_str(&self.config.url)
			.map_err(|err| OrmError::connection(format!("invalid sqlite url: {err}")))?
			.create_if_missing(true);
		let conn = options
			.connect()
			.await
			.map_err(|err| OrmError::connection(format!("cannot open sqlite session: {err}")))?;
		Ok(Box::new(SqliteConnection { conn: Some(conn) }))
	}

	fn config(&self) -> &DatabaseConfig {
		&self.config
	}
}

/// One exclusive sqlx SQLite session
pub struct SqliteConnection {
	conn: Option<sqlx::SqliteConnection>,
}

impl SqliteConnection {
	fn session(&mut self) -> OrmResult<&mut sqlx::SqliteConnection> {
		self.conn
			.as_mut()
			.ok_or_else(|| OrmError::connection("connection is closed"))
	}

	fn bind_value<'q>(
		query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
		value: &'q SqlValue,
	) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
		match value {
			SqlValue::Null => query.bind(None::<i64>),
			SqlValue::Bool(b) => query.bind(*b),
			SqlValue::Int(i) => query.bind(*i),
			SqlValue::Float(f) => query.bind(*f),
			SqlValue::Text(s) => query.bind(s.as_str()),
			SqlValue::Bytes(b) => query.bind(b.as_slice()),
			SqlValue::Timestamp(dt) => query.bind(*dt),
		}
	}

	fn convert_row(sqlite_row: &SqliteRow) -> Row {
		let mut row = Row::new();
		for column in sqlite_row.columns() {
			let name = column.name();
			let type_name = column.type_info().name().to_uppercase();

			// Probe for NULL first: try_get::<i64> on a NULL column can
			// report a default instead of failing.
			let is_null = sqlite_row
				.try_get::<Option<String>, _>(name)
				.ok()
				.flatten()
				.is_none() && sqlite_row
				.try_get::<Option<i64>, _>(name)
				.ok()
				.flatten()
				.is_none() && sqlite_row
				.try_get::<Option<f64>, _>(name)
				.ok()
				.flatten()
				.is_none() && sqlite_row
				.try_get::<Option<Vec<u8>>, _>(name)
				.ok()
				.flatten()
				.is_none();
			if is_null {
				row.insert(name, SqlValue::Null);
				continue;
			}

			// Booleans are stored as integers; the declared type is the
			// only way to tell them apart.
			if type_name.contains("BOOL") {
				if let Ok(value) = sqlite_row.try_get::<i64, _>(name) {
					row.insert(name, SqlValue::Bool(value != 0));
				} else if let Ok(value) = sqlite_row.try_get::<bool, _>(name) {
					row.insert(name, SqlValue::Bool(value));
				} else {
					row.insert(name, SqlValue::Null);
				}
			} else if (type_name.contains("DATETIME") || type_name.contains("TIMESTAMP"))
				&& let Ok(value) = sqlite_row.try_get::<chrono::NaiveDateTime, _>(name)
			{
				row.insert(
					name,
					SqlValue::Timestamp(chrono::DateTime::from_naive_utc_and_offset(
						value,
						chrono::Utc,
					)),
				);
			} else if let Ok(value) = sqlite_row.try_get::<i64, _>(name) {
				row.insert(name, SqlValue::Int(value));
			} else if let Ok(value) = sqlite_row.try_get::<f64, _>(name) {
				row.insert(name, SqlValue::Float(value));
			} else if let Ok(value) = sqlite_row.try_get::<String, _>(name) {
				row.insert(name, SqlValue::Text(value));
			} else if let Ok(value) = sqlite_row.try_get::<Vec<u8>, _>(name) {
				row.insert(name, SqlValue::Bytes(value));
			} else {
				row.insert(name, SqlValue::Null);
			}
		}
		row
	}
}

#[async_trait]
impl Connection for SqliteConnection {
	async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> OrmResult<ExecResult> {
		let session = self.session()?;
		let mut query = sqlx::query(sql);
		for param in params {
			query = Self::bind_value(query, param);
		}
		let result = query.execute(session).await.map_err(OrmError::statement)?;
		let last_insert_id = Some(result.last_insert_rowid()).filter(|id| *id > 0);
		Ok(ExecResult {
			rows_affected: result.rows_affected(),
			last_insert_id,
		})
	}

	async fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> OrmResult<Vec<Row>> {
		let session = self.session()?;
		let mut query = sqlx::query(sql);
		for param in params {
			query = Self::bind_value(query, param);
		}
		let rows = query
			.fetch_all(session)
			.await
			.map_err(OrmError::statement)?;
		Ok(rows.iter().map(Self::convert_row).collect())
	}

	async fn fetch_optional(&mut self, sql: &str, params: &[SqlValue]) -> OrmResult<Option<Row>> {
		let session = self.session()?;
		let mut query = sqlx::query(sql);
		for param in params {
			query = Self::bind_value(query, param);
		}
		let row = query
			.fetch_optional(session)
			.await
			.map_err(OrmError::statement)?;
		Ok(row.as_ref().map(Self::convert_row))
	}

	async fn close(&mut self) -> OrmResult<()> {
		if let Some(conn) = self.conn.take() {
			sqlx::Connection::close(conn)
				.await
				.map_err(|err| OrmError::connection(format!("close failed: {err}")))?;
		}
		Ok(())
	}
}
