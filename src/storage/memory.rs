//! In-process index store
//!
//! [`MemoryStore`] keeps every submitted document in submission order.
//! It backs the in-process pipeline used by tests and local runs without
//! an Elasticsearch node.

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::storage::IndexStore;

/// Index store that records documents in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<Bytes>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents submitted so far, oldest first
    pub async fn documents(&self) -> Vec<Bytes> {
        self.documents.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl IndexStore for MemoryStore {
    async fn submit(&self, document: Bytes) -> Result<Bytes> {
        let mut documents = self.documents.lock().await;
        documents.push(document);
        Ok(Bytes::from(format!(
            r#"{{"_id":"{}","created":true}}"#,
            documents.len()
        )))
    }
}
