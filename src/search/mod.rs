//! Full-text title search over alternate titles.
//!
//! Documents live in `search_titles`, with an FTS5 external-content index on
//! the normalised title text. [`reindex`] rebuilds documents from the
//! imported data; [`index`] holds the write and read sessions.

pub mod index;
pub mod reindex;

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub use index::{SearchHit, SearchReader, SearchWriter, title_search};
pub use reindex::{ReindexStats, Reindexer};

/// Characters dropped before indexing; they never separate tokens.
pub const IGNORE_CHARS: [char; 4] = ['\'', '(', ')', '.'];

/// Fold a title for indexing and querying.
///
/// NFKD decomposition with combining marks removed, lowercased, and
/// [`IGNORE_CHARS`] deleted, so `Amélie` and `amelie` index the same.
#[must_use]
pub fn normalise(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c) && !IGNORE_CHARS.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// One searchable alternate title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDocument {
    /// `{title_id}-{aka}`; unique per document.
    pub search_id: String,
    pub title_id: String,
    /// Display text, not normalised.
    pub title: String,
    pub premiered_year: Option<i64>,
    pub ended_year: Option<i64>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
}

impl SearchDocument {
    #[must_use]
    pub fn new(title_id: &str, title: &str) -> Self {
        Self {
            search_id: format!("{title_id}-{title}"),
            title_id: title_id.to_string(),
            title: title.to_string(),
            premiered_year: None,
            ended_year: None,
            rating: None,
            votes: None,
        }
    }

    /// The text stored in the full-text index.
    #[must_use]
    pub fn title_norm(&self) -> String {
        normalise(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise() {
        assert_eq!(normalise("Amélie"), "amelie");
        assert_eq!(normalise("Ocean's Eleven (2001)."), "oceans eleven 2001");
        assert_eq!(normalise("ＦＵＬＬ"), "full");
        assert_eq!(normalise(""), "");
    }

    #[test]
    fn test_document_search_id() {
        let doc = SearchDocument::new("tt0000001", "Carmencita");
        assert_eq!(doc.search_id, "tt0000001-Carmencita");
        assert_eq!(doc.title_norm(), "carmencita");
    }
}
