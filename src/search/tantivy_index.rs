use crate::error::{Error, Result};
use crate::models::{Document, DocumentBatch, SearchHit};
use crate::search::{run_blocking, SearchIndex};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use tantivy::schema::Value;
use tantivy::{
    collector::TopDocs,
    doc,
    query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery},
    schema::{Field, IndexRecordOption, Schema, STORED, STRING, TEXT},
    snippet::SnippetGenerator,
    tokenizer::{Token, TokenStream},
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term,
};
use tracing::debug;

const WRITER_HEAP_BYTES: usize = 50_000_000;
const TITLE_BOOST: f32 = 2.0;

/// Field handles of the fixed index layout.
///
/// `title`, `content` and `url` are tokenized and stored. `id` holds the url
/// untokenized and is the key used to replace a document on rewrite.
#[derive(Debug, Clone, Copy)]
pub struct IndexSchema {
    pub id: Field,
    pub title: Field,
    pub content: Field,
    pub url: Field,
}

impl IndexSchema {
    pub fn build() -> Schema {
        let mut builder = Schema::builder();
        builder.add_text_field("id", STRING | STORED);
        builder.add_text_field("title", TEXT | STORED);
        builder.add_text_field("content", TEXT | STORED);
        builder.add_text_field("url", TEXT | STORED);
        builder.build()
    }

    fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            id: schema.get_field("id")?,
            title: schema.get_field("title")?,
            content: schema.get_field("content")?,
            url: schema.get_field("url")?,
        })
    }
}

#[derive(Clone)]
pub struct TantivyIndex {
    index: Index,
    reader: IndexReader,
    fields: IndexSchema,
}

impl TantivyIndex {
    /// Opens the index stored at `path`, or `None` if nothing is there.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let open_error = |source: tantivy::TantivyError| Error::IndexOpen {
            path: path.to_path_buf(),
            source,
        };
        let index = Index::open_in_dir(path).map_err(open_error)?;
        Self::from_index(index).map(Some).map_err(open_error)
    }

    /// Creates an empty index at `path`, creating the directory if needed.
    pub fn create(path: &Path) -> Result<Self> {
        let create_error = |source: tantivy::TantivyError| Error::IndexOpen {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(path).map_err(|err| create_error(err.into()))?;
        let index = Index::create_in_dir(path, IndexSchema::build()).map_err(create_error)?;
        Self::from_index(index).map_err(create_error)
    }

    /// An index that lives only in memory.
    pub fn in_ram() -> Result<Self> {
        let index = Index::create_in_ram(IndexSchema::build());
        Self::from_index(index).map_err(|source| Error::IndexOpen {
            path: "<ram>".into(),
            source,
        })
    }

    fn from_index(index: Index) -> tantivy::Result<Self> {
        let fields = IndexSchema::from_schema(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn to_document(&self, doc: &TantivyDocument) -> Document {
        let text = |field| {
            doc.get_first(field)
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Document {
            title: text(self.fields.title),
            content: text(self.fields.content),
            url: text(self.fields.url),
        }
    }

    /// Match query: `text` is run through each field's tokenizer and every
    /// resulting term is OR-ed in. Title terms weigh `TITLE_BOOST` times more.
    ///
    /// Query syntax has no meaning here; `todo: milk` and `milk -todo` both
    /// look for `todo` and `milk`.
    fn match_query(&self, text: &str) -> tantivy::Result<BooleanQuery> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for field in [self.fields.title, self.fields.content, self.fields.url] {
            let mut tokenizer = self.index.tokenizer_for_field(field)?;
            let mut terms: Vec<Term> = Vec::new();
            tokenizer.token_stream(text).process(&mut |token: &Token| {
                let term = Term::from_field_text(field, &token.text);
                if !terms.contains(&term) {
                    terms.push(term);
                }
            });

            for term in terms {
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                let query: Box<dyn Query> = if field == self.fields.title {
                    Box::new(BoostQuery::new(query, TITLE_BOOST))
                } else {
                    query
                };
                clauses.push((Occur::Should, query));
            }
        }
        Ok(BooleanQuery::new(clauses))
    }

    fn write_now(&self, batch: DocumentBatch) -> Result<usize> {
        let count = batch.len();
        let mut writer: IndexWriter = self
            .index
            .writer(WRITER_HEAP_BYTES)
            .map_err(Error::IndexWrite)?;

        for item in batch.into_documents() {
            writer.delete_term(Term::from_field_text(self.fields.id, &item.url));
            writer
                .add_document(doc!(
                    self.fields.id => item.url.as_str(),
                    self.fields.title => item.title.as_str(),
                    self.fields.content => item.content.as_str(),
                    self.fields.url => item.url.as_str(),
                ))
                .map_err(Error::IndexWrite)?;
        }

        // dropping the writer on an error above discards everything added
        writer.commit().map_err(Error::IndexWrite)?;
        self.reader.reload().map_err(Error::IndexWrite)?;
        debug!(documents = count, "batch committed");
        Ok(count)
    }

    fn search_now(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query = self.match_query(text).map_err(Error::Search)?;
        if query.clauses().is_empty() {
            debug!(query = text, "query has no searchable terms");
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .map_err(Error::Search)?;
        let snippets = SnippetGenerator::create(&searcher, &query, self.fields.content)
            .map_err(Error::Search)?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address).map_err(Error::Search)?;
            let snippet = snippets.snippet_from_doc(&doc);
            hits.push(SearchHit {
                score,
                document: self.to_document(&doc),
                highlight: (!snippet.is_empty()).then(|| snippet.to_html()),
            });
        }
        Ok(hits)
    }
}

#[async_trait]
impl SearchIndex for TantivyIndex {
    async fn write_batch(&self, batch: DocumentBatch) -> Result<usize> {
        let index = self.clone();
        run_blocking(move || index.write_now(batch)).await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let index = self.clone();
        let query = query.to_owned();
        run_blocking(move || index.search_now(&query, limit)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn doc(url: &str, title: &str, content: &str) -> Document {
        Document {
            title: title.to_string(),
            content: content.to_string(),
            url: url.to_string(),
        }
    }

    fn batch(docs: Vec<Document>) -> DocumentBatch {
        let mut batch = DocumentBatch::new();
        for doc in docs {
            batch.push(doc);
        }
        batch
    }

    #[tokio::test]
    async fn test_index_and_search() -> Result<()> {
        let index = TantivyIndex::in_ram()?;
        index
            .write_batch(batch(vec![
                doc("/d/rust.md", "Rust Programming", "Learn Rust programming language"),
                doc("/d/python.md", "Python Guide", "Python programming tutorial"),
            ]))
            .await?;

        let results = index.search("rust", 10).await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.url, "/d/rust.md");
        assert_eq!(results[0].document.content, "Learn Rust programming language");

        let results = index.search("python", 10).await?;
        assert_eq!(results.len(), 1);

        let results = index.search("programming", 10).await?;
        assert_eq!(results.len(), 2);

        let results = index.search("javascript", 10).await?;
        assert!(results.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_title_match_ranks_above_body_match() -> Result<()> {
        let index = TantivyIndex::in_ram()?;
        index
            .write_batch(batch(vec![
                doc("/d/b.html", "Beta", "Some notes that mention Alpha in passing"),
                doc("/d/a.md", "Alpha", "Some notes"),
            ]))
            .await?;

        let first = index.search("alpha", 10).await?;
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].document.title, "Alpha");
        assert!(first[0].score >= first[1].score);

        let second = index.search("alpha", 10).await?;
        let urls = |hits: &[SearchHit]| -> Vec<String> {
            hits.iter().map(|hit| hit.document.url.clone()).collect()
        };
        assert_eq!(urls(&first), urls(&second));
        Ok(())
    }

    #[tokio::test]
    async fn test_highlight_marks_matched_terms() -> Result<()> {
        let index = TantivyIndex::in_ram()?;
        index
            .write_batch(batch(vec![doc(
                "/d/a.txt",
                "a.txt",
                "tantivy is a full text search engine library",
            )]))
            .await?;

        let hits = index.search("search", 10).await?;
        let highlight = hits[0].highlight.as_deref().unwrap_or_default();
        assert!(highlight.contains("<b>search</b>"), "{highlight}");
        Ok(())
    }

    #[tokio::test]
    async fn test_rewrite_same_url_keeps_one_document() -> Result<()> {
        let index = TantivyIndex::in_ram()?;
        index
            .write_batch(batch(vec![doc("/d/a.md", "Old", "stale words")]))
            .await?;
        index
            .write_batch(batch(vec![doc("/d/a.md", "New", "fresh words")]))
            .await?;

        assert_eq!(index.num_docs(), 1);
        assert!(index.search("stale", 10).await?.is_empty());
        assert_eq!(index.search("fresh", 10).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_query_is_tolerated() -> Result<()> {
        let index = TantivyIndex::in_ram()?;
        index
            .write_batch(batch(vec![doc("/d/a.md", "Alpha", "text")]))
            .await?;

        let hits = index.search("alpha (", 10).await?;
        assert_eq!(hits.len(), 1);
        assert!(index.search("alpha", 0).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_query_syntax_is_plain_text() -> Result<()> {
        let index = TantivyIndex::in_ram()?;
        index
            .write_batch(batch(vec![
                doc("/d/t.txt", "t.txt", "todo buy milk"),
                doc("/d/r.md", "Rust", "systems language"),
            ]))
            .await?;

        for query in ["todo: milk", "todo:milk", "milk -todo", "+milk"] {
            let hits = index.search(query, 10).await?;
            assert_eq!(hits.len(), 1, "{query}");
            assert_eq!(hits[0].document.url, "/d/t.txt", "{query}");
        }

        let hits = index.search("NOT rust", 10).await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.url, "/d/r.md");

        assert!(index.search("-- : ()", 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_open_missing_and_reopen() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index");

        assert!(TantivyIndex::open(&path)?.is_none());

        let index = TantivyIndex::create(&path)?;
        index
            .write_batch(batch(vec![doc("/d/a.md", "Alpha", "persisted")]))
            .await?;
        drop(index);

        let reopened = TantivyIndex::open(&path)?.expect("index should exist");
        assert_eq!(reopened.num_docs(), 1);
        assert_eq!(reopened.search("persisted", 10).await?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_open_rejects_non_index_directory() {
        let dir = tempdir().unwrap();
        let err = TantivyIndex::open(dir.path()).err().unwrap();
        assert!(matches!(err, Error::IndexOpen { .. }));
    }
}
