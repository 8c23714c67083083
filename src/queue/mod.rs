//! Queue abstraction and implementations
//!
//! The engine pops incoming lines from one key and pushes responses onto
//! another. Both directions go through the [`Queue`] trait so the dispatch
//! code never depends on a concrete client:
//!
//! - [`redis::RedisQueue`] -- `BLPOP`/`RPUSH` against a Redis server.
//! - [`memory::MemoryQueue`] -- in-process FIFO lists, used by tests and
//!   by `memory://` configurations.

pub mod memory;
pub mod redis;
pub mod resp;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::config::QueueConfig;
use crate::error::{BotbotError, Result};

pub use memory::MemoryQueue;
pub use redis::RedisQueue;

/// An item taken off the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popped {
    /// Key the payload was popped from
    pub key: String,
    /// Raw payload
    pub payload: Bytes,
}

/// FIFO queue keyed by name.
///
/// Implementations must be safe to share between the listener and the
/// executor without extra locking.
#[async_trait::async_trait]
pub trait Queue: Send + Sync + std::fmt::Debug {
    /// Pop the head of the first non-empty list among `keys`, waiting up to
    /// `timeout` for one to receive data.
    ///
    /// Returns `Ok(None)` when the wait ran out. A timeout is not an error.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Queue` when the backend cannot be reached or
    /// replies with something unexpected.
    async fn blocking_pop(&self, keys: &[String], timeout: Duration) -> Result<Option<Popped>>;

    /// Append `payload` to the list at `key`.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Queue` when the push could not be delivered.
    async fn push(&self, key: &str, payload: Bytes) -> Result<()>;
}

/// Build the queue described by `config`.
///
/// # Errors
///
/// Returns `BotbotError::Startup` if the URL scheme is unsupported or the
/// backend cannot be reached.
pub async fn connect(config: &QueueConfig) -> Result<Arc<dyn Queue>> {
    let url = url::Url::parse(&config.url)
        .map_err(|e| BotbotError::Startup(format!("invalid queue url {}: {}", config.url, e)))?;

    match url.scheme() {
        "memory" => Ok(Arc::new(MemoryQueue::new())),
        "redis" => {
            let queue = RedisQueue::connect(&url).await.map_err(|e| {
                BotbotError::Startup(format!("cannot reach queue at {}: {}", config.url, e))
            })?;
            Ok(Arc::new(queue))
        }
        other => Err(BotbotError::Startup(format!("unsupported queue scheme: {}", other)).into()),
    }
}
