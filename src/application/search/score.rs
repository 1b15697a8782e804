//! Fuzzy field scoring.
//!
//! Approximate substring matching over lowercased character sequences: exact
//! occurrences score 0 and report every occurrence range; otherwise the best
//! query-sized window by edit distance scores `distance / query_len` and
//! reports that window. Reported ranges index the original field text. Field scores combine into a document score as the
//! product of `field_score ^ weight` over matched fields — lower is better,
//! and perfect field scores take a small epsilon so the field weights still
//! order otherwise-equal matches (title above content above tags).

use crate::domain::search::{FieldKind, FieldMatch, MatchRange, SearchDocument};

/// Similarity cutoff: a field scoring above this does not count as a match.
pub const SCORE_THRESHOLD: f64 = 0.4;
/// Minimum query length considered at all.
pub const MIN_QUERY_LEN: usize = 2;
/// Stand-in for a perfect (zero) field score during weighting.
const PERFECT_SCORE: f64 = 0.001;

/// Ranking weights per field.
pub const FIELD_WEIGHTS: [(FieldKind, f64); 3] = [
    (FieldKind::Title, 0.6),
    (FieldKind::Content, 0.3),
    (FieldKind::Tags, 0.1),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FieldScore {
    /// Normalized edit distance in `[0, 1]`; 0 is a perfect match.
    pub score: f64,
    /// Half-open character ranges that contributed to the match.
    pub ranges: Vec<MatchRange>,
}

/// Score `query` against one field's text; `None` when the field does not
/// clear the similarity threshold or the query is below the minimum length.
/// Ranges are offsets into the original field text, not its lowercase form:
/// some lowercase mappings change length ('İ' becomes two characters), so
/// every lowered character carries the index of the original it came from.
pub fn score_field(query: &str, text: &str) -> Option<FieldScore> {
    let query: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    if query.len() < MIN_QUERY_LEN {
        return None;
    }
    let (text, origins) = lower_with_origins(text);
    if text.is_empty() {
        return None;
    }

    let exact = exact_occurrences(&query, &text);
    if !exact.is_empty() {
        return Some(FieldScore {
            score: 0.0,
            ranges: exact
                .into_iter()
                .map(|range| original_range(&origins, range))
                .collect(),
        });
    }

    let (start, distance) = best_window(&query, &text);
    let score = distance as f64 / query.len() as f64;
    if score > SCORE_THRESHOLD {
        return None;
    }
    let lowered = MatchRange {
        start,
        end: (start + query.len()).min(text.len()),
    };
    Some(FieldScore {
        score,
        ranges: vec![original_range(&origins, lowered)],
    })
}

/// Lowercase `text` character by character, recording for each lowered
/// character the index of the original character that produced it.
fn lower_with_origins(text: &str) -> (Vec<char>, Vec<usize>) {
    let mut lowered = Vec::new();
    let mut origins = Vec::new();
    for (index, ch) in text.chars().enumerate() {
        for lc in ch.to_lowercase() {
            lowered.push(lc);
            origins.push(index);
        }
    }
    (lowered, origins)
}

/// Map a non-empty range over the lowered sequence back onto the original
/// character offsets.
fn original_range(origins: &[usize], range: MatchRange) -> MatchRange {
    MatchRange {
        start: origins[range.start],
        end: origins[range.end - 1] + 1,
    }
}

/// Score `query` against every weighted field of `document`. `None` when no
/// field matches; otherwise the combined score and the per-field match
/// metadata, in weight order.
pub fn score_document(query: &str, document: &SearchDocument) -> Option<(f64, Vec<FieldMatch>)> {
    let mut combined = 1.0_f64;
    let mut matches = Vec::new();
    for (field, weight) in FIELD_WEIGHTS {
        let joined_tags;
        let text: &str = match field {
            FieldKind::Title => &document.title,
            FieldKind::Content => &document.content,
            FieldKind::Tags => {
                joined_tags = document.tags.join(" ");
                &joined_tags
            }
        };
        let Some(field_score) = score_field(query, text) else {
            continue;
        };
        combined *= field_score.score.max(PERFECT_SCORE).powf(weight);
        matches.push(FieldMatch {
            field,
            ranges: field_score.ranges,
        });
    }
    if matches.is_empty() {
        None
    } else {
        Some((combined, matches))
    }
}

fn exact_occurrences(query: &[char], text: &[char]) -> Vec<MatchRange> {
    if query.len() > text.len() {
        return Vec::new();
    }
    let mut ranges = Vec::new();
    for start in 0..=(text.len() - query.len()) {
        if text[start..start + query.len()] == *query {
            ranges.push(MatchRange {
                start,
                end: start + query.len(),
            });
        }
    }
    ranges
}

/// The leftmost lowest-distance window of query length; `(start, distance)`.
fn best_window(query: &[char], text: &[char]) -> (usize, usize) {
    if text.len() < query.len() {
        return (0, levenshtein(query, text));
    }
    let mut best = (0, usize::MAX);
    for start in 0..=(text.len() - query.len()) {
        let distance = levenshtein(query, &text[start..start + query.len()]);
        if distance < best.1 {
            best = (start, distance);
        }
    }
    best
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0_usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
