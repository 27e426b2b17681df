//! Startup: decide whether to reuse, create or rebuild the on-disk index, and
//! fill a fresh index from a single crawl.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::crawler::Crawler;
use crate::error::{Error, Result};
use crate::models::DocumentBatch;
use crate::search::{SearchIndex, TantivyIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An existing index was opened and the crawl skipped.
    Opened,
    /// A new index was created and filled with this many documents.
    Built { documents: usize },
}

pub struct PreparedIndex {
    pub index: TantivyIndex,
    pub outcome: Outcome,
}

/// Opens the index at `index_path`, building it from `crawler` when it does
/// not exist yet or when `refresh` is set.
///
/// A failed build removes the new index again so the next start retries the
/// build instead of serving a half-filled index.
pub async fn prepare_index(
    index_path: &Path,
    refresh: bool,
    crawler: &Crawler,
) -> Result<PreparedIndex> {
    if refresh && index_path.exists() {
        info!(path = %index_path.display(), "refresh requested, removing existing index");
        fs::remove_dir_all(index_path).map_err(|source| Error::IndexReset {
            path: index_path.to_path_buf(),
            source,
        })?;
    }

    if let Some(index) = TantivyIndex::open(index_path)? {
        info!(path = %index_path.display(), documents = index.num_docs(), "opened existing index");
        return Ok(PreparedIndex {
            index,
            outcome: Outcome::Opened,
        });
    }

    info!(path = %index_path.display(), "creating index");
    let index = TantivyIndex::create(index_path)?;
    match build_index(&index, crawler).await {
        Ok(documents) => Ok(PreparedIndex {
            index,
            outcome: Outcome::Built { documents },
        }),
        Err(err) => {
            drop(index);
            if let Err(cleanup) = fs::remove_dir_all(index_path) {
                warn!(path = %index_path.display(), error = %cleanup, "failed to remove incomplete index");
            }
            Err(err)
        }
    }
}

/// Crawls everything into one batch and writes it with a single commit.
pub async fn build_index<I: SearchIndex>(index: &I, crawler: &Crawler) -> Result<usize> {
    let mut batch = DocumentBatch::new();
    crawler.crawl_into(&mut batch)?;
    let written = index.write_batch(batch).await?;
    info!(documents = written, root = %crawler.root().display(), "index built");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{default_extensions, normalize_extensions};
    use crate::search::MemoryIndex;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        docs: PathBuf,
        index: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("sub")).unwrap();
        fs::write(docs.join("a.md"), "alpha notes").unwrap();
        fs::write(docs.join("sub/b.html"), "<title>Beta</title><body>alpha</body>").unwrap();
        fs::write(docs.join("c.txt"), "gamma").unwrap();
        fs::write(docs.join("notes.pdf"), "alpha pdf").unwrap();
        let index = dir.path().join("index");
        Fixture {
            _dir: dir,
            docs,
            index,
        }
    }

    #[tokio::test]
    async fn test_missing_index_is_created_and_built() -> Result<()> {
        let fx = fixture();
        let crawler = Crawler::new(&fx.docs, default_extensions());

        let prepared = prepare_index(&fx.index, false, &crawler).await?;

        assert_eq!(prepared.outcome, Outcome::Built { documents: 3 });
        assert_eq!(prepared.index.num_docs(), 3);
        assert!(prepared.index.search("pdf", 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_index_skips_crawl() -> Result<()> {
        let fx = fixture();
        let crawler = Crawler::new(&fx.docs, default_extensions());
        drop(prepare_index(&fx.index, false, &crawler).await?);

        fs::write(fx.docs.join("d.md"), "added later").unwrap();
        let prepared = prepare_index(&fx.index, false, &crawler).await?;

        assert_eq!(prepared.outcome, Outcome::Opened);
        assert_eq!(prepared.index.num_docs(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_rebuilds_without_duplicates() -> Result<()> {
        let fx = fixture();
        let crawler = Crawler::new(&fx.docs, default_extensions());
        drop(prepare_index(&fx.index, false, &crawler).await?);
        drop(prepare_index(&fx.index, false, &crawler).await?);

        let prepared = prepare_index(&fx.index, true, &crawler).await?;

        assert_eq!(prepared.outcome, Outcome::Built { documents: 3 });
        assert_eq!(prepared.index.num_docs(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_build_leaves_no_index() {
        let fx = fixture();
        let crawler = Crawler::new(fx.docs.join("missing"), default_extensions());

        let err = prepare_index(&fx.index, false, &crawler).await.err().unwrap();

        assert!(matches!(err, Error::Crawl { .. }));
        assert!(!fx.index.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_leaves_no_index() {
        let fx = fixture();
        let dead = fx.docs.join("dead.md");
        std::os::unix::fs::symlink(fx.docs.join("gone.md"), &dead).unwrap();
        let crawler = Crawler::new(&fx.docs, default_extensions());

        let err = prepare_index(&fx.index, false, &crawler).await.err().unwrap();

        match err {
            Error::Crawl { path, .. } => assert_eq!(path, dead),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!fx.index.exists());
    }

    #[tokio::test]
    async fn test_index_inside_root_is_not_crawled() -> Result<()> {
        let fx = fixture();
        let index_path = fx.docs.join("index.tantivy");
        let crawler = Crawler::new(&fx.docs, normalize_extensions("md,html,txt,json"))
            .skipping(&index_path);

        let prepared = prepare_index(&index_path, false, &crawler).await?;
        assert_eq!(prepared.outcome, Outcome::Built { documents: 3 });
        drop(prepared);

        let prepared = prepare_index(&index_path, true, &crawler).await?;
        assert_eq!(prepared.outcome, Outcome::Built { documents: 3 });
        assert!(prepared.index.search("json", 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_index_is_fatal() {
        let fx = fixture();
        fs::create_dir_all(&fx.index).unwrap();
        fs::write(fx.index.join("meta.json"), "not json").unwrap();
        let crawler = Crawler::new(&fx.docs, default_extensions());

        let err = prepare_index(&fx.index, false, &crawler).await.err().unwrap();

        assert!(matches!(err, Error::IndexOpen { .. }));
    }

    #[test]
    fn test_build_index_writes_one_batch() {
        let fx = fixture();
        let crawler = Crawler::new(&fx.docs, default_extensions());
        let index = MemoryIndex::new();

        let written = tokio_test::block_on(build_index(&index, &crawler)).unwrap();

        assert_eq!(written, 3);
        assert_eq!(index.len(), 3);
    }
}
