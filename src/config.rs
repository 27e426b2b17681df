use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use crate::crawler::{default_extensions, normalize_extensions};
use crate::DEFAULT_RESULT_LIMIT;

#[derive(Parser, Debug)]
#[command(version, about = "Index a directory of documents and search it from a browser")]
pub struct Cli {
    /// Directory to index and serve. Defaults to the current directory.
    #[arg(long, env = "DOC_SEARCH_PATH")]
    pub path: Option<PathBuf>,

    /// Delete and rebuild the index.
    #[arg(long, env = "DOC_SEARCH_REFRESH")]
    pub refresh: bool,

    /// Comma-separated file extensions to index, e.g. "md,txt".
    #[arg(long, env = "DOC_SEARCH_EXTENSIONS")]
    pub extensions: Option<String>,

    /// Where the index is stored.
    #[arg(long, env = "DOC_SEARCH_INDEX", default_value = "index.tantivy")]
    pub index: PathBuf,

    /// Address the web server listens on.
    #[arg(long, env = "DOC_SEARCH_ADDR", default_value = "0.0.0.0:3030")]
    pub addr: SocketAddr,

    /// Maximum number of results per search.
    #[arg(long, default_value_t = DEFAULT_RESULT_LIMIT)]
    pub limit: usize,

    /// Seconds a single search may take before it is abandoned.
    #[arg(long, default_value_t = 10)]
    pub search_timeout: u64,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Everything the process needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub index_path: PathBuf,
    pub refresh: bool,
    pub extensions: Vec<String>,
    pub addr: SocketAddr,
    pub result_limit: usize,
    pub search_timeout: Duration,
}

impl Cli {
    pub fn into_settings(self) -> Result<Settings> {
        let root = match self.path {
            Some(path) => path,
            None => std::env::current_dir().context("failed to read the current directory")?,
        };
        let root = root
            .canonicalize()
            .with_context(|| format!("crawl root {} is not accessible", root.display()))?;

        let extensions = match self.extensions.as_deref() {
            Some(list) => normalize_extensions(list),
            None => default_extensions(),
        };
        anyhow::ensure!(!extensions.is_empty(), "no file extensions to index");

        Ok(Settings {
            root,
            index_path: self.index,
            refresh: self.refresh,
            extensions,
            addr: self.addr,
            result_limit: self.limit,
            search_timeout: Duration::from_secs(self.search_timeout),
        })
    }

    /// Default `tracing` filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "doc_search=info,tower_http=info",
            1 => "doc_search=debug,tower_http=debug",
            _ => "doc_search=trace,tower_http=trace",
        }
    }
}
