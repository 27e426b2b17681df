use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::extract::extract;
use crate::models::{Document, DocumentBatch};

pub const DEFAULT_EXTENSIONS: [&str; 4] = [".html", ".htm", ".txt", ".md"];

/// Parses a comma-separated extension list such as `"md, txt,.html"`.
///
/// Items are trimmed, blanks dropped, and a leading `.` added where missing.
pub fn normalize_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}

pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

/// Walks a directory tree and turns every file with an allowed extension
/// into a [`Document`].
#[derive(Debug, Clone)]
pub struct Crawler {
    root: PathBuf,
    extensions: Vec<String>,
    skipped: Option<PathBuf>,
}

impl Crawler {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
            skipped: None,
        }
    }

    /// Leaves the directory at `dir` out of the walk, e.g. an index stored
    /// under the crawl root.
    pub fn skipping(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skipped = Some(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Case-sensitive suffix match against the allowed extensions.
    pub fn is_allowed(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }

    /// Documents for every qualifying file, in file-name order.
    ///
    /// Walk and read errors are yielded in place; callers decide whether to stop.
    pub fn documents(&self) -> impl Iterator<Item = Result<Document>> + '_ {
        // resolved here, the skipped directory may only exist once the crawl starts
        let skipped = self.skipped.as_ref().and_then(|dir| dir.canonicalize().ok());

        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| match &skipped {
                Some(skipped) if entry.file_type().is_dir() => {
                    entry.path().canonicalize().ok().as_ref() != Some(skipped)
                }
                _ => true,
            })
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => return Some(Err(Error::from(err))),
                };
                if entry.file_type().is_dir() {
                    return None;
                }
                let file_name = entry.file_name().to_string_lossy();
                if !self.is_allowed(&file_name) {
                    debug!(path = %entry.path().display(), "skipping file");
                    return None;
                }
                Some(Self::load(entry.path(), &file_name))
            })
    }

    /// Adds every document to `batch`, stopping at the first error.
    ///
    /// Returns the number of documents added.
    pub fn crawl_into(&self, batch: &mut DocumentBatch) -> Result<usize> {
        let mut count = 0;
        for document in self.documents() {
            batch.push(document?);
            count += 1;
        }
        info!(root = %self.root.display(), documents = count, "crawl finished");
        Ok(count)
    }

    fn load(path: &Path, file_name: &str) -> Result<Document> {
        let raw = fs::read(path).map_err(|source| Error::Crawl {
            path: path.to_path_buf(),
            source,
        })?;
        let extracted = extract(&raw);
        let title = if extracted.title.is_empty() {
            file_name.to_string()
        } else {
            extracted.title
        };
        debug!(path = %path.display(), %title, "indexing file");

        Ok(Document {
            title,
            content: extracted.body,
            url: path.to_string_lossy().into_owned(),
        })
    }
}
