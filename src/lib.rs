pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod gateway;
mod models;
pub mod search;
pub mod web;

pub use error::{Error, Result};
pub use models::{Document, DocumentBatch, SearchHit, SearchResult};

use crawler::Crawler;
use search::SearchIndex;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_RESULT_LIMIT: usize = 50;

/// Runs queries against an index and maps hits to root-relative results.
pub struct SearchEngine<I: SearchIndex> {
    index: I,
    root: PathBuf,
    limit: usize,
}

impl<I: SearchIndex> SearchEngine<I> {
    pub fn new(index: I, root: impl Into<PathBuf>) -> Self {
        Self {
            index,
            root: root.into(),
            limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Crawls `crawler` into the index with a single batch write.
    pub async fn build(&self, crawler: &Crawler) -> Result<usize> {
        gateway::build_index(&self.index, crawler).await
    }

    /// Results in the index's relevance order.
    ///
    /// A blank query returns nothing without touching the index. Hits whose
    /// url is not under the crawl root are logged and left out.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.index.search(query, self.limit).await?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| self.to_result(hit))
            .collect())
    }

    fn to_result(&self, hit: SearchHit) -> Option<SearchResult> {
        let Some(url) = relative_url(&self.root, &hit.document.url) else {
            warn!(
                url = %hit.document.url,
                root = %self.root.display(),
                "dropping hit outside the crawl root"
            );
            return None;
        };
        Some(SearchResult {
            title: hit.document.title,
            content: hit.document.content,
            url,
            score: hit.score,
            highlight: hit.highlight,
        })
    }
}

/// `url` relative to `root`, with `/` separators.
///
/// `None` when `url` is not strictly inside `root`.
pub fn relative_url(root: &Path, url: &str) -> Option<String> {
    let relative = Path::new(url).strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
