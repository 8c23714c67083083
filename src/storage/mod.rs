//! Index store abstraction
//!
//! Store actions end up in an [`IndexStore`]. The production implementation
//! is [`elasticsearch::Elasticsearch`]; [`memory::MemoryStore`] records
//! documents in process.

pub mod elasticsearch;
pub mod memory;

use bytes::Bytes;

use crate::error::Result;

pub use elasticsearch::Elasticsearch;
pub use memory::MemoryStore;

/// Destination for documents produced by store actions.
///
/// Implementations must tolerate concurrent use and repeated submission of
/// the same document.
#[async_trait::async_trait]
pub trait IndexStore: Send + Sync + std::fmt::Debug {
    /// Submit one JSON document and return the store's response body.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Storage` or `BotbotError::Http` when the
    /// document was not accepted.
    async fn submit(&self, document: Bytes) -> Result<Bytes>;
}
