//! Pool lifecycle observers

use async_trait::async_trait;

/// Receives a human-readable message after each completed operation.
///
/// Registration is append-only for the pool's lifetime; notification is a
/// fan-out in registration order. A failing observer never affects the
/// operation's result or the other observers.
#[async_trait]
pub trait PoolObserver: Send + Sync {
	async fn receive(&self, message: &str) -> anyhow::Result<()>;
}

/// Observer that forwards every message to the tracing subscriber
pub struct LogObserver;

#[async_trait]
impl PoolObserver for LogObserver {
	async fn receive(&self, message: &str) -> anyhow::Result<()> {
		tracing::info!(target: "grappelli::pool", "{message}");
		Ok(())
	}
}
