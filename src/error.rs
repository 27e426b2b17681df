use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to crawl {path}")]
    Crawl {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open index at {path}")]
    IndexOpen {
        path: PathBuf,
        #[source]
        source: tantivy::TantivyError,
    },

    #[error("failed to remove index at {path}")]
    IndexReset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write documents to the index")]
    IndexWrite(#[source] tantivy::TantivyError),

    #[error("search failed: {0}")]
    Search(#[source] tantivy::TantivyError),

    #[error("search timed out after {0:?}")]
    SearchTimeout(Duration),

    #[error("index task failed")]
    Task(#[from] tokio::task::JoinError),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        Error::Crawl {
            path,
            source: err.into(),
        }
    }
}
