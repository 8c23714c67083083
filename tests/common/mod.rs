use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use botbot_plugins::config::QueueConfig;
use botbot_plugins::queue::MemoryQueue;
use botbot_plugins::storage::MemoryStore;
use botbot_plugins::Context;
use tempfile::TempDir;

/// Context over in-process collaborators with a one second pop timeout
#[allow(dead_code)]
pub fn memory_context() -> (Context, Arc<MemoryQueue>, Arc<MemoryStore>) {
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

/// Poll `check` until it returns true or five seconds pass
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met within five seconds");
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("botbot.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
