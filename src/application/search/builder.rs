//! Search corpus construction.
//!
//! Reads published Markdown documents from the content store, strips them to
//! plain text, and produces the flat JSON corpus served as the search index
//! asset. Per-document failures are logged and skipped so one bad file never
//! sinks the build.

use std::path::Path;
use std::sync::Arc;

use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, parse_document};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::ports::{ContentError, ContentStore};
use crate::domain::search::SearchDocument;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("failed to serialize search index: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write search index to `{path}`: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Frontmatter fields read from the TOML block between `---` fences.
/// Documents without frontmatter deserialize to the default, which is
/// unpublished and therefore skipped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Frontmatter {
    title: String,
    description: String,
    tags: Vec<String>,
    published: bool,
}

pub struct SearchIndexBuilder {
    store: Arc<dyn ContentStore>,
    prefix: String,
}

impl SearchIndexBuilder {
    pub fn new(store: Arc<dyn ContentStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Build the corpus: every published `.md` document under the prefix,
    /// stripped to plain text with newlines collapsed to spaces.
    pub async fn build(&self) -> Result<Vec<SearchDocument>, BuildError> {
        let keys = self.store.list_keys(&self.prefix).await?;
        let mut documents = Vec::new();
        for key in keys {
            if !key.ends_with(".md") {
                continue;
            }
            let raw = match self.store.read(&key).await {
                Ok(raw) => raw,
                Err(error) => {
                    warn!(key = %key, error = %error, "Skipping unreadable content item");
                    continue;
                }
            };
            let (frontmatter, body) = match split_frontmatter(&raw) {
                Ok(parts) => parts,
                Err(error) => {
                    warn!(key = %key, error = %error, "Skipping content with invalid frontmatter");
                    continue;
                }
            };
            if !frontmatter.published {
                debug!(key = %key, "Skipping unpublished content");
                continue;
            }
            documents.push(SearchDocument {
                slug: slug_from_key(&key, &self.prefix),
                title: frontmatter.title,
                description: frontmatter.description,
                tags: frontmatter.tags,
                content: collapse_whitespace(&strip_markdown(body)),
            });
        }
        info!(documents = documents.len(), "Search corpus built");
        Ok(documents)
    }

    /// Serialize the corpus as a pretty JSON array at `path`.
    pub async fn write_index(
        &self,
        documents: &[SearchDocument],
        path: &Path,
    ) -> Result<(), BuildError> {
        let json = serde_json::to_vec_pretty(documents)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| BuildError::Write {
                path: path.display().to_string(),
                source,
            })
    }
}

/// Split a leading `---` TOML frontmatter block from the Markdown body.
/// Documents without a block yield the default frontmatter and the full
/// text as body.
fn split_frontmatter(raw: &str) -> Result<(Frontmatter, &str), toml::de::Error> {
    let Some(rest) = raw.strip_prefix("---\n") else {
        return Ok((Frontmatter::default(), raw));
    };
    if let Some(end) = rest.find("\n---\n") {
        let frontmatter = toml::from_str(&rest[..end])?;
        Ok((frontmatter, &rest[end + 5..]))
    } else if let Some(header) = rest.strip_suffix("\n---") {
        Ok((toml::from_str(header)?, ""))
    } else {
        Ok((Frontmatter::default(), raw))
    }
}

/// Render the Markdown AST down to its text content.
fn strip_markdown(body: &str) -> String {
    let arena = Arena::new();
    let root = parse_document(&arena, body, &Options::default());
    let mut text = String::new();
    collect_text(root, &mut text);
    text
}

fn collect_text<'a>(node: &'a AstNode<'a>, out: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(literal) => out.push_str(literal),
        NodeValue::Code(code) => out.push_str(&code.literal),
        NodeValue::CodeBlock(block) => out.push_str(&block.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
        _ => {}
    }
    for child in node.children() {
        collect_text(child, out);
    }
    if node.data.borrow().value.block() {
        out.push(' ');
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn slug_from_key(key: &str, prefix: &str) -> String {
    let stripped = key.strip_prefix(prefix).unwrap_or(key);
    let stripped = stripped.trim_start_matches('/');
    stripped.strip_suffix(".md").unwrap_or(stripped).to_string()
}
