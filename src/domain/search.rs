//! Search corpus model: documents, match ranges, and ranked results.

use serde::{Deserialize, Serialize};

/// One published content item as stored in the search index asset.
///
/// `content` is the Markdown body stripped to plain text with newlines
/// collapsed to single spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
}

/// Searchable document fields, in ranking-weight order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Title,
    Content,
    Tags,
}

/// Half-open `[start, end)` character-offset range within a field's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchRange {
    pub start: usize,
    pub end: usize,
}

/// The ranges within one field that contributed to a match; used by callers
/// to render highlighted snippets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMatch {
    pub field: FieldKind,
    pub ranges: Vec<MatchRange>,
}

/// A matched document with its combined score (lower is better) and
/// per-field match metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub document: SearchDocument,
    pub score: f64,
    pub matches: Vec<FieldMatch>,
}
