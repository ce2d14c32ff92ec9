//! Rebuild search documents from imported alternate titles.

use serde::Serialize;
use std::time::Instant;
use tracing::info;

use super::SearchDocument;
use super::index::SearchWriter;
use crate::error::Result;
use crate::storage::{SearchSource, SqliteStorage};
use crate::tsv::types::per_second;

/// Rows read and written per page.
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

/// Title types indexed when none are given.
pub const DEFAULT_TYPES: [&str; 1] = ["movie"];

/// Statistics from a reindex run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReindexStats {
    pub types: Vec<String>,
    /// Alternate titles eligible for indexing.
    pub total: u64,
    /// Documents written.
    pub indexed: u64,
    pub pages: usize,
    pub seconds: f64,
}

/// Pages through alternate titles of the allowed title types and writes one
/// search document per row.
pub struct Reindexer<'a> {
    storage: &'a mut SqliteStorage,
    types: Vec<String>,
    page_size: usize,
}

impl<'a> Reindexer<'a> {
    /// Create a reindexer for the given title types.
    pub fn new(storage: &'a mut SqliteStorage, types: Vec<String>) -> Self {
        Self {
            storage,
            types,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of rows per page (at least one).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Run the reindex.
    ///
    /// Each page is written in its own session, so pages finished before a
    /// failure stay indexed. Re-running overwrites documents in place.
    ///
    /// # Errors
    ///
    /// Returns an error if reading a page or writing its documents fails.
    pub fn run(self) -> Result<ReindexStats> {
        let Self {
            storage,
            types,
            page_size,
        } = self;
        let started = Instant::now();
        let total = storage.count_search_sources(&types)?;
        info!(?types, total, "Beginning search reindex");

        let mut stats = ReindexStats {
            types: types.clone(),
            total,
            ..ReindexStats::default()
        };
        let mut after = 0;
        loop {
            let page = storage.search_source_page(&types, after, page_size)?;
            let Some(last) = page.last() else {
                break;
            };
            after = last.aka_id;

            let page_started = Instant::now();
            let docs: Vec<SearchDocument> = page.iter().map(document).collect();
            SearchWriter::session(storage, |writer| {
                for doc in &docs {
                    writer.insert_or_update(doc)?;
                }
                Ok(())
            })?;

            stats.indexed += docs.len() as u64;
            stats.pages += 1;
            let rate = per_second(docs.len(), page_started.elapsed().as_secs_f64());
            let (minutes, seconds) = eta(total.saturating_sub(stats.indexed), rate);
            info!(
                indexed = stats.indexed,
                total,
                docs_per_sec = rate.round(),
                "Indexed {} of {} titles, ETA {minutes}m {seconds}s",
                stats.indexed,
                total
            );
        }

        stats.seconds = started.elapsed().as_secs_f64();
        info!(
            indexed = stats.indexed,
            pages = stats.pages,
            seconds = %format!("{:.1}", stats.seconds),
            "Search reindex done"
        );
        Ok(stats)
    }
}

/// Project one joined row into the search schema.
fn document(source: &SearchSource) -> SearchDocument {
    let mut doc = SearchDocument::new(&source.title_id, &source.aka);
    doc.premiered_year = source.premiered;
    doc.ended_year = source.ended;
    doc.rating = source.rating;
    doc.votes = source.votes;
    doc
}

/// Remaining time at the given rate, as minutes and seconds.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn eta(remaining: u64, rate: f64) -> (u64, u64) {
    if rate <= 0.0 {
        return (0, 0);
    }
    minsec((remaining as f64 / rate) as u64)
}

/// Split seconds into whole minutes and leftover seconds.
#[must_use]
pub fn minsec(seconds: u64) -> (u64, u64) {
    (seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::title_search;
    use rusqlite::types::Value;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn storage_with_akas() -> SqliteStorage {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.ensure_placeholder().unwrap();
        storage.get_or_create("title_type", "name", "short").unwrap();
        storage.get_or_create("title_type", "name", "movie").unwrap();
        storage
            .bulk_upsert(
                "title",
                &["title_id", "title_type_id", "primary_title", "premiered"],
                &["title_id"],
                &[
                    vec![text("tt0000001"), text("short"), text("Carmencita"), Value::Integer(1894)],
                    vec![text("tt0000012"), text("movie"), text("The Arrival of a Train"), Value::Integer(1896)],
                ],
                1000,
            )
            .unwrap();
        storage
            .bulk_upsert(
                "aka",
                &["title_id", "ordering", "aka"],
                &["title_id", "ordering"],
                &[
                    vec![text("tt0000001"), Value::Integer(1), text("Carmencita")],
                    vec![text("tt0000012"), Value::Integer(1), text("The Arrival of a Train")],
                    vec![text("tt0000012"), Value::Integer(2), text("L'arrivée d'un train")],
                ],
                1000,
            )
            .unwrap();
        storage
            .bulk_upsert(
                "rating",
                &["title_id", "rating", "votes"],
                &["title_id"],
                &[vec![text("tt0000012"), Value::Real(7.4), Value::Integer(13_000)]],
                1000,
            )
            .unwrap();
        storage
    }

    #[test]
    fn test_minsec() {
        assert_eq!(minsec(0), (0, 0));
        assert_eq!(minsec(125), (2, 5));
        assert_eq!(eta(100, 0.0), (0, 0));
        assert_eq!(eta(600, 10.0), (1, 0));
    }

    #[test]
    fn test_reindex_without_rating() {
        let mut storage = storage_with_akas();
        let stats = Reindexer::new(&mut storage, vec!["short".into()]).run().unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.indexed, 1);

        let (rating, votes): (Option<f64>, Option<i64>) = storage
            .conn()
            .query_row(
                "SELECT rating, votes FROM search_titles WHERE search_id = 'tt0000001-Carmencita'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(rating, None);
        assert_eq!(votes, None);
        assert_eq!(
            title_search(&storage, "carmencita", None, None).unwrap(),
            ["tt0000001"]
        );
    }

    #[test]
    fn test_reindex_only_allowed_types() {
        let mut storage = storage_with_akas();
        let stats = Reindexer::new(&mut storage, vec!["movie".into()])
            .with_page_size(1)
            .run()
            .unwrap();
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.pages, 2);
        assert!(title_search(&storage, "carmencita", None, None).unwrap().is_empty());
        assert_eq!(
            title_search(&storage, "L'arrivée", Some(1896), None).unwrap(),
            ["tt0000012"]
        );
    }

    #[test]
    fn test_reindex_is_idempotent() {
        let mut storage = storage_with_akas();
        Reindexer::new(&mut storage, vec!["movie".into()]).run().unwrap();
        Reindexer::new(&mut storage, vec!["movie".into()]).run().unwrap();
        assert_eq!(storage.count("search_titles").unwrap(), 2);
    }
}
