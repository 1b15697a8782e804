//! Lazily loaded search index consumer.
//!
//! The corpus fetch is deferred to an idle moment after mount; queries
//! issued before the fetch completes return an empty result set, and a
//! failed fetch parks the consumer in the empty state for the rest of the
//! page load.

use std::cmp::Ordering as CmpOrdering;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::gauge;
use tracing::{info, warn};

use crate::application::ports::IndexFetcher;
use crate::application::search::score::{MIN_QUERY_LEN, score_document};
use crate::domain::search::{SearchDocument, SearchResult};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "search::index";

const METRIC_INDEX_DOCUMENTS: &str = "brezza_search_index_documents";

/// At most this many results are surfaced to the calling UI.
pub const RESULT_LIMIT: usize = 5;

/// Fallback idle window before the deferred fetch where no real idle signal
/// exists.
pub const DEFAULT_PREFETCH_DELAY: Duration = Duration::from_secs(2);

enum IndexState {
    Pending,
    Ready(Arc<Vec<SearchDocument>>),
    Failed,
}

struct IndexInner {
    fetcher: Arc<dyn IndexFetcher>,
    state: RwLock<IndexState>,
}

/// Handle to the search index; clones share the fetched corpus.
#[derive(Clone)]
pub struct SearchIndex {
    inner: Arc<IndexInner>,
}

impl SearchIndex {
    pub fn new(fetcher: Arc<dyn IndexFetcher>) -> Self {
        Self {
            inner: Arc::new(IndexInner {
                fetcher,
                state: RwLock::new(IndexState::Pending),
            }),
        }
    }

    /// Fetch the corpus now. Failure logs a warning and leaves the consumer
    /// permanently empty for this page load.
    pub async fn prefetch(&self) {
        match self.inner.fetcher.fetch().await {
            Ok(documents) => {
                info!(documents = documents.len(), "Search index loaded");
                gauge!(METRIC_INDEX_DOCUMENTS).set(documents.len() as f64);
                *rw_write(&self.inner.state, SOURCE, "prefetch") =
                    IndexState::Ready(Arc::new(documents));
            }
            Err(error) => {
                warn!(error = %error, "Search index fetch failed; queries stay empty");
                *rw_write(&self.inner.state, SOURCE, "prefetch") = IndexState::Failed;
            }
        }
    }

    /// Defer the fetch until `delay` has passed (the idle-callback analog).
    pub fn schedule_prefetch(&self, delay: Duration) {
        let index = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            index.prefetch().await;
        });
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            *rw_read(&self.inner.state, SOURCE, "is_ready"),
            IndexState::Ready(_)
        )
    }

    /// Ranked fuzzy search, best match first, at most [`RESULT_LIMIT`]
    /// results. Empty until the index is ready and for queries shorter than
    /// the minimum match length.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }
        let documents = {
            match &*rw_read(&self.inner.state, SOURCE, "search") {
                IndexState::Ready(documents) => Arc::clone(documents),
                IndexState::Pending | IndexState::Failed => return Vec::new(),
            }
        };

        let mut results: Vec<SearchResult> = documents
            .iter()
            .filter_map(|document| {
                score_document(query, document).map(|(score, matches)| SearchResult {
                    document: document.clone(),
                    score,
                    matches,
                })
            })
            .collect();
        results.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(CmpOrdering::Equal));
        results.truncate(RESULT_LIMIT);
        results
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::ports::FetchError;
    use crate::domain::search::{FieldKind, MatchRange};

    struct StaticFetcher {
        documents: Result<Vec<SearchDocument>, ()>,
    }

    #[async_trait]
    impl IndexFetcher for StaticFetcher {
        async fn fetch(&self) -> Result<Vec<SearchDocument>, FetchError> {
            self.documents
                .clone()
                .map_err(|()| FetchError::Fetch("unreachable host".to_string()))
        }
    }

    fn doc(slug: &str, title: &str, content: &str, tags: &[&str]) -> SearchDocument {
        SearchDocument {
            slug: slug.to_string(),
            title: title.to_string(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            content: content.to_string(),
        }
    }

    async fn ready_index(documents: Vec<SearchDocument>) -> SearchIndex {
        let index = SearchIndex::new(Arc::new(StaticFetcher {
            documents: Ok(documents),
        }));
        index.prefetch().await;
        index
    }

    #[tokio::test]
    async fn queries_before_the_fetch_return_empty() {
        let index = SearchIndex::new(Arc::new(StaticFetcher {
            documents: Ok(vec![doc("x", "Rust Basics", "Rust", &[])]),
        }));
        assert!(index.search("rust").is_empty());
        assert!(!index.is_ready());
    }

    #[tokio::test]
    async fn a_failed_fetch_parks_the_consumer_empty() {
        let index = SearchIndex::new(Arc::new(StaticFetcher { documents: Err(()) }));
        index.prefetch().await;
        assert!(!index.is_ready());
        assert!(index.search("rust").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_prefetch_loads_after_the_idle_window() {
        let index = SearchIndex::new(Arc::new(StaticFetcher {
            documents: Ok(vec![doc("x", "Rust Basics", "Rust", &[])]),
        }));
        index.schedule_prefetch(DEFAULT_PREFETCH_DELAY);
        assert!(!index.is_ready());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(index.is_ready());
    }

    #[tokio::test]
    async fn short_queries_return_empty() {
        let index = ready_index(vec![doc("x", "Rust Basics", "Rust", &[])]).await;
        assert!(index.search("").is_empty());
        assert!(index.search("a").is_empty());
    }

    #[tokio::test]
    async fn title_match_returns_the_document_with_its_range() {
        // The end-to-end contract example: one document, a title hit, and a
        // half-open range over the matched prefix.
        let index = ready_index(vec![doc(
            "x",
            "Rust Basics",
            "Rust is a systems language",
            &["rust"],
        )])
        .await;

        let results = index.search("Rust");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.slug, "x");

        let title_match = results[0]
            .matches
            .iter()
            .find(|m| m.field == FieldKind::Title)
            .expect("title matched");
        assert_eq!(title_match.ranges, [MatchRange { start: 0, end: 4 }]);
    }

    #[tokio::test]
    async fn title_hits_rank_above_content_hits() {
        let index = ready_index(vec![
            doc("in-content", "Weekly notes", "all about tokio runtimes", &[]),
            doc("in-title", "tokio deep dive", "scheduling internals", &[]),
        ])
        .await;

        let results = index.search("tokio");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.slug, "in-title");
        assert_eq!(results[1].document.slug, "in-content");
    }

    #[tokio::test]
    async fn only_the_first_five_results_surface() {
        let documents = (0..8)
            .map(|i| doc(&format!("post-{i}"), "Rust notes", "Rust", &[]))
            .collect();
        let index = ready_index(documents).await;
        assert_eq!(index.search("rust").len(), RESULT_LIMIT);
    }
}
