//! Shared handles to external collaborators
//!
//! A [`Context`] is built once at startup and cloned into every worker.
//! Nothing in it changes afterwards, so it needs no locking; the queue and
//! index store clients are themselves safe for concurrent use.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{Config, QueueConfig};
use crate::error::Result;
use crate::queue::{self, Queue};
use crate::storage::{Elasticsearch, IndexStore};

/// Read-only handles shared by the listener, the plugins and the executor
#[derive(Debug, Clone)]
pub struct Context {
    queue: Arc<dyn Queue>,
    store: Arc<dyn IndexStore>,
    queue_config: Arc<QueueConfig>,
}

impl Context {
    /// Assemble a context from already-built collaborators
    pub fn new(
        queue: Arc<dyn Queue>,
        store: Arc<dyn IndexStore>,
        queue_config: QueueConfig,
    ) -> Self {
        Self {
            queue,
            store,
            queue_config: Arc::new(queue_config),
        }
    }

    /// Build the collaborators described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Startup` when the queue cannot be reached or
    /// the index store client cannot be created.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let queue = queue::connect(&config.queue).await?;
        let store = Elasticsearch::new(&config.elasticsearch)?;
        info!(
            queue = %config.queue.url,
            index_store = %store.url(),
            "Collaborators ready"
        );
        Ok(Self::new(queue, Arc::new(store), config.queue.clone()))
    }

    /// Queue used for ingestion and responses
    pub fn queue(&self) -> &Arc<dyn Queue> {
        &self.queue
    }

    /// Index store receiving stored lines
    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    /// Key incoming lines are popped from
    pub fn ingest_key(&self) -> &str {
        &self.queue_config.ingest_key
    }

    /// Key responses are pushed onto
    pub fn response_key(&self) -> &str {
        &self.queue_config.response_key
    }

    /// Bounded wait for one pop
    pub fn pop_timeout(&self) -> Duration {
        self.queue_config.pop_timeout()
    }
}
