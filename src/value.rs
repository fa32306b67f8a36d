//! Bound parameter values and result rows

use crate::error::{OrmError, OrmResult};
use std::collections::HashMap;

/// A value bound into a statement or read out of a result row
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	Bytes(Vec<u8>),
	Timestamp(chrono::DateTime<chrono::Utc>),
}

impl SqlValue {
	pub fn is_null(&self) -> bool {
		matches!(self, SqlValue::Null)
	}

	/// Canonical key form, used to detect in-flight (table, id) pairs
	/// during relationship resolution.
	pub(crate) fn key(&self) -> String {
		match self {
			SqlValue::Null => "null".to_string(),
			SqlValue::Bool(b) => format!("b:{b}"),
			SqlValue::Int(i) => format!("i:{i}"),
			SqlValue::Float(f) => format!("f:{f}"),
			SqlValue::Text(s) => format!("t:{s}"),
			SqlValue::Bytes(b) => {
				let hex: String = b.iter().map(|byte| format!("{byte:02x}")).collect();
				format!("x:{hex}")
			}
			SqlValue::Timestamp(dt) => format!("ts:{}", dt.to_rfc3339()),
		}
	}
}

impl From<bool> for SqlValue {
	fn from(b: bool) -> Self {
		SqlValue::Bool(b)
	}
}

impl From<i32> for SqlValue {
	fn from(i: i32) -> Self {
		SqlValue::Int(i as i64)
	}
}

impl From<i64> for SqlValue {
	fn from(i: i64) -> Self {
		SqlValue::Int(i)
	}
}

impl From<f64> for SqlValue {
	fn from(f: f64) -> Self {
		SqlValue::Float(f)
	}
}

impl From<&str> for SqlValue {
	fn from(s: &str) -> Self {
		SqlValue::Text(s.to_string())
	}
}

impl From<String> for SqlValue {
	fn from(s: String) -> Self {
		SqlValue::Text(s)
	}
}

impl From<Vec<u8>> for SqlValue {
	fn from(b: Vec<u8>) -> Self {
		SqlValue::Bytes(b)
	}
}

impl From<chrono::DateTime<chrono::Utc>> for SqlValue {
	fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
		SqlValue::Timestamp(dt)
	}
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
	fn from(value: Option<T>) -> Self {
		match value {
			Some(v) => v.into(),
			None => SqlValue::Null,
		}
	}
}

impl TryFrom<SqlValue> for i64 {
	type Error = OrmError;

	fn try_from(value: SqlValue) -> OrmResult<Self> {
		match value {
			SqlValue::Int(i) => Ok(i),
			other => Err(OrmError::persistence(format!(
				"cannot convert {other:?} to i64"
			))),
		}
	}
}

impl TryFrom<SqlValue> for String {
	type Error = OrmError;

	fn try_from(value: SqlValue) -> OrmResult<Self> {
		match value {
			SqlValue::Text(s) => Ok(s),
			other => Err(OrmError::persistence(format!(
				"cannot convert {other:?} to String"
			))),
		}
	}
}

impl TryFrom<SqlValue> for bool {
	type Error = OrmError;

	fn try_from(value: SqlValue) -> OrmResult<Self> {
		match value {
			SqlValue::Bool(b) => Ok(b),
			SqlValue::Int(i) => Ok(i != 0),
			other => Err(OrmError::persistence(format!(
				"cannot convert {other:?} to bool"
			))),
		}
	}
}

impl TryFrom<SqlValue> for f64 {
	type Error = OrmError;

	fn try_from(value: SqlValue) -> OrmResult<Self> {
		match value {
			SqlValue::Float(f) => Ok(f),
			SqlValue::Int(i) => Ok(i as f64),
			other => Err(OrmError::persistence(format!(
				"cannot convert {other:?} to f64"
			))),
		}
	}
}

impl TryFrom<SqlValue> for Vec<u8> {
	type Error = OrmError;

	fn try_from(value: SqlValue) -> OrmResult<Self> {
		match value {
			SqlValue::Bytes(b) => Ok(b),
			other => Err(OrmError::persistence(format!(
				"cannot convert {other:?} to Vec<u8>"
			))),
		}
	}
}

impl TryFrom<SqlValue> for chrono::DateTime<chrono::Utc> {
	type Error = OrmError;

	fn try_from(value: SqlValue) -> OrmResult<Self> {
		match value {
			SqlValue::Timestamp(dt) => Ok(dt),
			other => Err(OrmError::persistence(format!(
				"cannot convert {other:?} to DateTime<Utc>"
			))),
		}
	}
}

/// A single result row, keyed by column name
#[derive(Debug, Clone, Default)]
pub struct Row {
	data: HashMap<String, SqlValue>,
}

impl Row {
	pub fn new() -> Self {
		Self {
			data: HashMap::new(),
		}
	}

	pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
		self.data.insert(column.into(), value);
	}

	/// Raw access to a column value; `None` when the row has no such column.
	pub fn value(&self, column: &str) -> Option<&SqlValue> {
		self.data.get(column)
	}

	/// Typed access; a missing column or a non-convertible value is an error.
	pub fn get<T>(&self, column: &str) -> OrmResult<T>
	where
		T: TryFrom<SqlValue, Error = OrmError>,
	{
		self.data
			.get(column)
			.cloned()
			.ok_or_else(|| OrmError::persistence(format!("column `{column}` not present in row")))
			.and_then(T::try_from)
	}

	/// Typed access treating SQL NULL as `None`.
	pub fn get_opt<T>(&self, column: &str) -> OrmResult<Option<T>>
	where
		T: TryFrom<SqlValue, Error = OrmError>,
	{
		match self.data.get(column) {
			None | Some(SqlValue::Null) => Ok(None),
			Some(value) => T::try_from(value.clone()).map(Some),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(SqlValue::Int(7), "i:7")]
	#[case(SqlValue::Text("abc".to_string()), "t:abc")]
	#[case(SqlValue::Null, "null")]
	#[case(SqlValue::Bytes(vec![0xab, 0x01]), "x:ab01")]
	fn test_value_key(#[case] value: SqlValue, #[case] expected: &str) {
		assert_eq!(value.key(), expected);
	}

	#[test]
	fn test_row_typed_access() {
		let mut row = Row::new();
		row.insert("id", SqlValue::Int(4));
		row.insert("name", SqlValue::Text("Gabi".to_string()));
		row.insert("department_id", SqlValue::Null);

		assert_eq!(row.get::<i64>("id").unwrap(), 4);
		assert_eq!(row.get::<String>("name").unwrap(), "Gabi");
		assert_eq!(row.get_opt::<i64>("department_id").unwrap(), None);
		assert!(row.get::<i64>("missing").is_err());
	}

	#[test]
	fn test_null_from_option() {
		assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
		assert_eq!(SqlValue::from(Some(3i64)), SqlValue::Int(3));
	}
}
