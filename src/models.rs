use std::collections::BTreeMap;

use serde::Serialize;

/// A crawled file as it is stored in the index.
///
/// `url` is the path the crawler visited and doubles as the document's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// A ranked match returned by a [`SearchIndex`](crate::search::SearchIndex).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub score: f32,
    pub document: Document,
    /// Engine-produced snippet with matched terms marked up. Opaque here.
    pub highlight: Option<String>,
}

/// A hit prepared for presentation: `url` is relative to the crawl root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    pub url: String,
    pub score: f32,
    pub highlight: Option<String>,
}

/// Documents gathered during a crawl, written to the index in one go.
///
/// Keyed by url so a later document for the same path replaces the earlier one.
#[derive(Debug, Default)]
pub struct DocumentBatch {
    documents: BTreeMap<String, Document>,
}

impl DocumentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, document: Document) {
        self.documents.insert(document.url.clone(), document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn into_documents(self) -> impl Iterator<Item = Document> {
        self.documents.into_values()
    }
}
