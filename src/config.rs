//! Database configuration
//!
//! Supplies `{url, user, password, pool_size}` to the connector and pool.
//! Loaded from a TOML file or built literally; there is no process-wide
//! singleton; the owner constructs one and passes it down explicitly.

use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::path::Path;

fn default_pool_size() -> usize {
	4
}

/// Connection settings for the pool's connector
///
/// # Examples
///
/// ```
/// use grappelli::config::DatabaseConfig;
///
/// let config: DatabaseConfig = toml::from_str(
///     r#"
///     url = "sqlite::memory:"
///     pool_size = 2
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.pool_size, 2);
/// assert!(config.user.is_empty());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
	pub url: String,
	#[serde(default)]
	pub user: String,
	#[serde(default)]
	pub password: String,
	#[serde(default = "default_pool_size")]
	pub pool_size: usize,
}

impl DatabaseConfig {
	pub fn new(url: impl Into<String>, pool_size: usize) -> Self {
		Self {
			url: url.into(),
			user: String::new(),
			password: String::new(),
			pool_size,
		}
	}

	/// Load settings from a TOML file.
	pub fn from_path(path: impl AsRef<Path>) -> OrmResult<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|err| {
			OrmError::connection(format!("cannot read config file {}: {err}", path.display()))
		})?;
		let config: DatabaseConfig = toml::from_str(&text)
			.map_err(|err| OrmError::connection(format!("invalid config file: {err}")))?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> OrmResult<()> {
		if self.url.is_empty() {
			return Err(OrmError::connection("database url must not be empty"));
		}
		if self.pool_size == 0 {
			return Err(OrmError::connection("pool_size must be at least 1"));
		}
		Ok(())
	}
}
