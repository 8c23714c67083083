//! In-process queue
//!
//! [`MemoryQueue`] keeps one FIFO list per key. Waiters are woken through a
//! [`Notify`]; a pop only removes an item at the moment it returns it, so
//! dropping a pending `blocking_pop` never loses data.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::error::Result;
use crate::queue::{Popped, Queue};

/// Queue backed by in-memory lists
#[derive(Debug, Default)]
pub struct MemoryQueue {
    lists: Mutex<HashMap<String, VecDeque<Bytes>>>,
    pushed: Notify,
}

impl MemoryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items waiting at `key`
    pub async fn len(&self, key: &str) -> usize {
        self.lists.lock().await.get(key).map_or(0, VecDeque::len)
    }

    /// True when nothing is waiting at `key`
    pub async fn is_empty(&self, key: &str) -> bool {
        self.len(key).await == 0
    }

    /// Remove and return everything waiting at `key`
    pub async fn drain(&self, key: &str) -> Vec<Bytes> {
        self.lists
            .lock()
            .await
            .get_mut(key)
            .map(|list| list.drain(..).collect())
            .unwrap_or_default()
    }

    async fn try_pop(&self, keys: &[String]) -> Option<Popped> {
        let mut lists = self.lists.lock().await;
        keys.iter().find_map(|key| {
            let payload = lists.get_mut(key)?.pop_front()?;
            Some(Popped {
                key: key.clone(),
                payload,
            })
        })
    }
}

#[async_trait::async_trait]
impl Queue for MemoryQueue {
    async fn blocking_pop(&self, keys: &[String], timeout: Duration) -> Result<Option<Popped>> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(popped) = self.try_pop(keys).await {
                return Ok(Some(popped));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn push(&self, key: &str, payload: Bytes) -> Result<()> {
        self.lists
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .push_back(payload);
        self.pushed.notify_waiters();
        Ok(())
    }
}
