//! Test utilities for botbot-plugins
//!
//! Builds a [`Context`] wired to in-process collaborators so unit tests can
//! drive plugins and workers without a queue server or Elasticsearch.

use std::sync::Arc;

use crate::config::QueueConfig;
use crate::context::Context;
use crate::queue::MemoryQueue;
use crate::storage::MemoryStore;

/// Create a context backed by a [`MemoryQueue`] and a [`MemoryStore`]
///
/// Returns the handles too so tests can inspect what was pushed or stored.
pub fn test_context() -> (Context, Arc<MemoryQueue>, Arc<MemoryStore>) {
    let queue = Arc::new(MemoryQueue::new());
    let store = Arc::new(MemoryStore::new());
    let queue_config = QueueConfig {
        url: "memory://".to_string(),
        pop_timeout_secs: 1,
        ..Default::default()
    };
    let ctx = Context::new(queue.clone(), store.clone(), queue_config);
    (ctx, queue, store)
}

/// A decoded line built from a JSON value
pub fn line(value: serde_json::Value) -> crate::line::Line {
    crate::line::Line::decode(value.to_string()).expect("test line should decode")
}
