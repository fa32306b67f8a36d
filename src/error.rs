//! Error taxonomy for the mapper and pool
//!
//! Three terminal error kinds: a type is missing required declarations
//! (`Mapping`), the pool could not produce or hand out a connection
//! (`Connection`), or a statement failed against the database
//! (`Persistence`). No operation retries; transient database errors
//! propagate to the caller uninterpreted.

use thiserror::Error;

/// Result alias used throughout the crate
pub type OrmResult<T> = Result<T, OrmError>;

/// Errors raised by mapper and pool operations
#[derive(Debug, Error)]
pub enum OrmError {
	/// The entity type lacks a required declaration (table binding, id
	/// column, or a well-formed relationship set).
	#[error("mapping error: {0}")]
	Mapping(String),

	/// Pool construction or acquisition failed.
	#[error("connection error: {0}")]
	Connection(String),

	/// A statement failed to execute, or an update/delete was attempted
	/// on an entity with no id.
	#[error("persistence error: {message}")]
	Persistence {
		message: String,
		#[source]
		source: Option<sqlx::Error>,
	},
}

impl OrmError {
	/// A mapping error with the offending type name in the message.
	pub fn mapping(message: impl Into<String>) -> Self {
		OrmError::Mapping(message.into())
	}

	pub fn connection(message: impl Into<String>) -> Self {
		OrmError::Connection(message.into())
	}

	/// A persistence error with no underlying driver cause.
	pub fn persistence(message: impl Into<String>) -> Self {
		OrmError::Persistence {
			message: message.into(),
			source: None,
		}
	}

	/// A persistence error wrapping a failed statement.
	pub(crate) fn statement(source: sqlx::Error) -> Self {
		OrmError::Persistence {
			message: "statement execution failed".to_string(),
			source: Some(source),
		}
	}

	pub fn is_mapping(&self) -> bool {
		matches!(self, OrmError::Mapping(_))
	}

	pub fn is_connection(&self) -> bool {
		matches!(self, OrmError::Connection(_))
	}

	pub fn is_persistence(&self) -> bool {
		matches!(self, OrmError::Persistence { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_display() {
		let err = OrmError::mapping("struct `Foo` declares no table binding");
		assert_eq!(
			err.to_string(),
			"mapping error: struct `Foo` declares no table binding"
		);
		assert!(err.is_mapping());
	}

	#[test]
	fn test_persistence_without_source() {
		let err = OrmError::persistence("entity has no id");
		assert!(err.is_persistence());
		assert!(std::error::Error::source(&err).is_none());
	}
}
