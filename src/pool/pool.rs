//! Connection pool implementation

use super::events::PoolObserver;
use crate::connection::{Connection, Connector};
use crate::error::{OrmError, OrmResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};

/// One physical connection tagged with its stable identity.
struct PooledEntry {
	id: String,
	conn: Box<dyn Connection>,
}

struct PoolShared {
	available: Mutex<VecDeque<PooledEntry>>,
	permits: Arc<Semaphore>,
	size: usize,
	observers: RwLock<Vec<Arc<dyn PoolObserver>>>,
	// Only read and written while `available` is locked, so a guard drop
	// and `close` cannot interleave between the check and the push.
	closed: AtomicBool,
}

/// A fixed-size pool of physical database connections
///
/// The set of connections is established eagerly at construction and its
/// size never changes: at all times `checked_out + available == size`.
/// `acquire` suspends the calling task until a connection is free; the
/// permit queue wakes exactly one waiter per returned connection.
///
/// # Examples
///
/// ```no_run
/// use grappelli::config::DatabaseConfig;
/// use grappelli::pool::ConnectionPool;
/// use grappelli::sqlite::SqliteConnector;
///
/// # async fn example() -> grappelli::error::OrmResult<()> {
/// let config = DatabaseConfig::new("sqlite://app.db", 4);
/// let pool = ConnectionPool::open(SqliteConnector::new(config)).await?;
/// let conn = pool.acquire().await?;
/// drop(conn); // returned to the pool, one waiter woken
/// # Ok(())
/// # }
/// ```
pub struct ConnectionPool {
	shared: Arc<PoolShared>,
}

impl ConnectionPool {
	/// Eagerly open `config.pool_size` connections through the connector.
	/// Each connection gets a stable id that follows it through every
	/// checkout for the pool's lifetime.
	///
	/// When any open fails, the connections opened so far are closed
	/// before the error propagates.
	pub async fn open(connector: impl Connector) -> OrmResult<Self> {
		let config = connector.config();
		config.validate()?;
		let size = config.pool_size;

		let mut connections: VecDeque<PooledEntry> = VecDeque::with_capacity(size);
		for _ in 0..size {
			match connector.open().await {
				Ok(conn) => {
					let id = uuid::Uuid::new_v4().to_string();
					tracing::debug!(
						target: "grappelli::pool",
						connection_id = %id,
						"connection opened"
					);
					connections.push_back(PooledEntry { id, conn });
				}
				Err(err) => {
					for mut opened in connections {
						if let Err(close_err) = opened.conn.close().await {
							tracing::warn!(
								target: "grappelli::pool",
								connection_id = %opened.id,
								"cleanup close failed: {close_err}"
							);
						}
					}
					return Err(err);
				}
			}
		}

		tracing::debug!(target: "grappelli::pool", size, "pool established");
		Ok(Self {
			shared: Arc::new(PoolShared {
				available: Mutex::new(connections),
				permits: Arc::new(Semaphore::new(size)),
				size,
				observers: RwLock::new(Vec::new()),
				closed: AtomicBool::new(false),
			}),
		})
	}

	/// Take exclusive ownership of one connection, waiting until one is
	/// free. There is no internal timeout; callers needing a bounded wait
	/// wrap this in their own deadline.
	pub async fn acquire(&self) -> OrmResult<PooledConnection> {
		let permit = self
			.shared
			.permits
			.clone()
			.acquire_owned()
			.await
			.map_err(|_| OrmError::connection("pool is closed"))?;
		let entry = self
			.shared
			.available
			.lock()
			.pop_front()
			.ok_or_else(|| OrmError::connection("pool has no connection despite a free permit"))?;
		tracing::debug!(
			target: "grappelli::pool",
			connection_id = %entry.id,
			"connection checked out"
		);
		Ok(PooledConnection {
			entry: Some(entry),
			shared: Arc::clone(&self.shared),
			_permit: permit,
		})
	}

	/// Close every currently-available connection and refuse further
	/// acquisition. Connections still checked out are dropped when their
	/// guards return them.
	pub async fn close(&self) {
		self.shared.permits.close();

		let mut drained = Vec::new();
		{
			let mut available = self.shared.available.lock();
			// Set the flag under the lock so a guard dropping at the same
			// moment either lands in this drain or sees the flag.
			self.shared.closed.store(true, Ordering::SeqCst);
			while let Some(entry) = available.pop_front() {
				drained.push(entry);
			}
		}
		let outstanding = self.shared.size - drained.len();
		if outstanding > 0 {
			tracing::warn!(
				target: "grappelli::pool",
				outstanding,
				"closing pool with connections still checked out"
			);
		}
		for mut entry in drained {
			if let Err(err) = entry.conn.close().await {
				tracing::warn!(
					target: "grappelli::pool",
					connection_id = %entry.id,
					"close failed: {err}"
				);
			}
		}
	}

	/// Register an observer; registrations are append-only.
	pub async fn add_observer(&self, observer: Arc<dyn PoolObserver>) {
		let mut observers = self.shared.observers.write().await;
		observers.push(observer);
	}

	/// Fan a message out to every observer in registration order. One
	/// observer's failure is logged and swallowed so the rest still run.
	pub async fn notify(&self, message: &str) {
		let observers = self.shared.observers.read().await;
		for observer in observers.iter() {
			if let Err(err) = observer.receive(message).await {
				tracing::warn!(target: "grappelli::pool", "observer failed: {err}");
			}
		}
	}

	pub fn size(&self) -> usize {
		self.shared.size
	}

	/// Connections currently idle in the pool.
	pub fn available(&self) -> usize {
		self.shared.available.lock().len()
	}

	/// Connections currently held by callers.
	pub fn checked_out(&self) -> usize {
		self.shared.size - self.available()
	}

	pub fn is_closed(&self) -> bool {
		self.shared.closed.load(Ordering::SeqCst)
	}
}

/// Exclusive handle to one pooled connection
///
/// Dropping the handle returns the connection to the pool and wakes one
/// waiter; release happens on every exit path, success or failure.
pub struct PooledConnection {
	entry: Option<PooledEntry>,
	shared: Arc<PoolShared>,
	_permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for PooledConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PooledConnection")
			.field("id", &self.entry.as_ref().map(|e| &e.id))
			.finish_non_exhaustive()
	}
}

impl PooledConnection {
	/// Stable identity of the underlying physical connection; the same
	/// value reappears every time this connection is checked out.
	pub fn connection_id(&self) -> &str {
		// Invariant: `entry` is Some until drop.
		&self.entry.as_ref().expect("connection already returned").id
	}
}

impl Deref for PooledConnection {
	type Target = dyn Connection;

	fn deref(&self) -> &Self::Target {
		&*self.entry.as_ref().expect("connection already returned").conn
	}
}

impl DerefMut for PooledConnection {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut *self
			.entry
			.as_mut()
			.expect("connection already returned")
			.conn
	}
}

impl Drop for PooledConnection {
	fn drop(&mut self) {
		if let Some(entry) = self.entry.take() {
			let mut available = self.shared.available.lock();
			if self.shared.closed.load(Ordering::SeqCst) {
				// The pool is drained; let the connection drop instead of
				// parking it open in a closed queue.
				drop(entry);
			} else {
				tracing::debug!(
					target: "grappelli::pool",
					connection_id = %entry.id,
					"connection returned"
				);
				available.push_back(entry);
			}
		}
		// The permit drops after the connection is back, so the woken
		// waiter always finds one.
	}
}
