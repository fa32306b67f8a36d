//! Fixed-size connection pooling
//!
//! The pool owns a bounded set of physical connections established
//! eagerly at construction, hands them out one at a time (suspending
//! callers while none are free), and fans lifecycle messages out to
//! registered observers.

pub mod events;
// Allow module_inception: re-exporting the pool submodule from pool.rs
// keeps imports as `grappelli::pool::ConnectionPool`.
#[allow(clippy::module_inception)]
pub mod pool;

pub use events::{LogObserver, PoolObserver};
pub use pool::{ConnectionPool, PooledConnection};
