use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DocumentBatch, SearchHit};

/// A full-text index the crawler writes to and the search engine reads from.
#[async_trait]
pub trait SearchIndex: Clone + Send + Sync + 'static {
    /// Writes every document of `batch` and commits once.
    ///
    /// Documents replace any stored document with the same url. On error
    /// nothing from the batch becomes visible to searches.
    async fn write_batch(&self, batch: DocumentBatch) -> Result<usize>;

    /// Runs a match query over title, content and url, best hits first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Runs synchronous index work on tokio's blocking pool.
///
/// The caller's future stays pending on the join handle, so a timeout around
/// it fires even while the work itself is still running.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

pub mod memory;
pub mod tantivy_index;

pub use memory::MemoryIndex;
pub use tantivy_index::TantivyIndex;
