//! End-to-end search tests: build the index asset from Markdown content on
//! disk, load it through a fetcher, and query it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use brezza::application::ports::{FetchError, IndexFetcher};
use brezza::application::search::builder::SearchIndexBuilder;
use brezza::application::search::index::SearchIndex;
use brezza::domain::search::{FieldKind, SearchDocument};
use brezza::infra::content::FsContentStore;

/// Loads the index asset from disk, standing in for the HTTP fetch.
struct FileFetcher {
    path: PathBuf,
}

#[async_trait]
impl IndexFetcher for FileFetcher {
    async fn fetch(&self) -> Result<Vec<SearchDocument>, FetchError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|error| FetchError::Fetch(error.to_string()))?;
        serde_json::from_slice(&raw).map_err(|error| FetchError::Decode(error.to_string()))
    }
}

const RUST_POST: &str = "---\n\
title = \"Rust Basics\"\n\
description = \"A first look at ownership\"\n\
tags = [\"rust\", \"tutorial\"]\n\
published = true\n\
---\n\
# Ownership\n\nEvery value in Rust has a single owner.\n";

const COOKING_POST: &str = "---\n\
title = \"Weeknight Cooking\"\n\
description = \"Fast dinners\"\n\
tags = [\"food\"]\n\
published = true\n\
---\n\
Nothing here mentions systems programming.\n";

const DRAFT_POST: &str = "---\n\
title = \"Rust Drafts\"\n\
published = false\n\
---\nUnfinished.\n";

async fn write_corpus(dir: &std::path::Path) -> PathBuf {
    let posts = dir.join("posts");
    std::fs::create_dir(&posts).expect("mkdir");
    std::fs::write(posts.join("rust-basics.md"), RUST_POST).expect("write");
    std::fs::write(posts.join("weeknight-cooking.md"), COOKING_POST).expect("write");
    std::fs::write(posts.join("rust-drafts.md"), DRAFT_POST).expect("write");

    let builder = SearchIndexBuilder::new(Arc::new(FsContentStore::new(dir)), "posts");
    let documents = builder.build().await.expect("build corpus");
    let output = dir.join("search-index.json");
    builder
        .write_index(&documents, &output)
        .await
        .expect("write index");
    output
}

#[tokio::test]
async fn built_index_answers_queries_after_prefetch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = write_corpus(dir.path()).await;

    let index = SearchIndex::new(Arc::new(FileFetcher { path: output }));
    assert!(!index.is_ready());
    assert!(index.search("rust").is_empty());

    index.prefetch().await;
    assert!(index.is_ready());

    let results = index.search("rust");
    assert_eq!(results.len(), 1, "drafts and unrelated posts are excluded");
    let hit = &results[0];
    assert_eq!(hit.document.slug, "rust-basics");
    assert_eq!(hit.document.title, "Rust Basics");
    assert!(hit.score < 0.4);

    let title_match = hit
        .matches
        .iter()
        .find(|field| field.field == FieldKind::Title)
        .expect("title matched");
    assert_eq!(title_match.ranges[0].start, 0);
    assert_eq!(title_match.ranges[0].end, 4);
}

/// In-memory fetcher for paused-clock tests; file I/O would complete on the
/// blocking pool outside the virtual clock.
struct StaticFetcher {
    documents: Vec<SearchDocument>,
}

#[async_trait]
impl IndexFetcher for StaticFetcher {
    async fn fetch(&self) -> Result<Vec<SearchDocument>, FetchError> {
        Ok(self.documents.clone())
    }
}

#[tokio::test(start_paused = true)]
async fn scheduled_prefetch_loads_after_the_idle_window() {
    let index = SearchIndex::new(Arc::new(StaticFetcher {
        documents: vec![SearchDocument {
            slug: "rust-basics".into(),
            title: "Rust Basics".into(),
            description: String::new(),
            tags: vec![],
            content: "ownership".into(),
        }],
    }));
    index.schedule_prefetch(Duration::from_secs(2));

    sleep(Duration::from_millis(1900)).await;
    assert!(!index.is_ready());

    sleep(Duration::from_millis(200)).await;
    assert!(index.is_ready());
}

#[tokio::test]
async fn queries_shorter_than_two_characters_return_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = write_corpus(dir.path()).await;

    let index = SearchIndex::new(Arc::new(FileFetcher { path: output }));
    index.prefetch().await;

    assert!(index.search("r").is_empty());
    assert!(index.search("   ").is_empty());
}
