use crate::error::Result;
use crate::models::{Document, DocumentBatch, SearchHit};
use crate::search::SearchIndex;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-process index for tests: term matching with a fixed title boost.
///
/// Also counts how many searches reached it.
#[derive(Clone, Default)]
pub struct MemoryIndex {
    documents: Arc<Mutex<BTreeMap<String, Document>>>,
    searches: Arc<AtomicUsize>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Stores a document as-is, bypassing batching.
    pub fn insert(&self, document: Document) {
        self.documents
            .lock()
            .unwrap()
            .insert(document.url.clone(), document);
    }
}

fn matches(text: &str, term: &str) -> usize {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| *word == term)
        .count()
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn write_batch(&self, batch: DocumentBatch) -> Result<usize> {
        let mut documents = self.documents.lock().unwrap();
        let count = batch.len();
        for document in batch.into_documents() {
            documents.insert(document.url.clone(), document);
        }
        Ok(count)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.lock().unwrap();
        let terms: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect();

        let mut hits = Vec::new();
        for document in documents.values() {
            let score: usize = terms
                .iter()
                .map(|term| {
                    2 * matches(&document.title, term)
                        + matches(&document.content, term)
                        + matches(&document.url, term)
                })
                .sum();
            if score > 0 {
                hits.push(SearchHit {
                    score: score as f32,
                    document: document.clone(),
                    highlight: None,
                });
            }
        }

        // stable sort keeps url order for equal scores
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}
