//! # Grappelli
//!
//! A small object-relational mapper built around declarative entity
//! schemas and a fixed-size connection pool.
//!
//! This crate combines:
//! - **Entity Metadata**: Declarative table/column/relationship descriptors
//! - **Relationship Resolution**: One-to-one, many-to-one, one-to-many, many-to-many
//! - **Statement Building**: Parameterized ANSI SQL from metadata
//! - **Connection Pooling**: Fixed-size blocking pool with lifecycle observers
//! - **SQLite Backend**: Default backend over sqlx
//!
//! ## Quick Start
//!
//! Implement [`Entity`] for a struct, open a [`ConnectionPool`] over a
//! [`SqliteConnector`], and drive everything through an [`EntityMapper`]:
//!
//! ```no_run
//! use grappelli::{
//! 	ConnectionPool, DatabaseConfig, EntityMapper, SqliteConnector,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> grappelli::OrmResult<()> {
//! let config = DatabaseConfig::new("sqlite://app.db", 4);
//! let pool = ConnectionPool::open(SqliteConnector::new(config)).await?;
//! let mapper = EntityMapper::new(Arc::new(pool));
//! # let _ = mapper;
//! # Ok(())
//! # }
//! ```
//!
//! Entities with relationships declare them in their schema; `save` walks
//! owned references and join tables, `find` eagerly resolves the full
//! graph with cycle protection. See [`EntitySchema`] for a worked example.

pub mod config;
pub mod connection;
pub mod error;
pub mod mapper;
pub mod metadata;
pub mod pool;
pub mod relations;
pub mod sqlite;
pub mod statements;
pub mod value;

pub use config::DatabaseConfig;
pub use connection::{Connection, Connector, ExecResult};
pub use error::{OrmError, OrmResult};
pub use mapper::EntityMapper;
pub use metadata::{describe, ColumnMeta, Entity, EntityMetadata, EntitySchema, Relation, RelationKind};
pub use pool::{ConnectionPool, LogObserver, PoolObserver, PooledConnection};
pub use relations::{ToMany, ToOne};
pub use sqlite::SqliteConnector;
pub use value::{Row, SqlValue};
