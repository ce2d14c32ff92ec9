//! Write and read sessions over the search index.

use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::HashSet;

use super::{SearchDocument, normalise};
use crate::error::Result;
use crate::storage::SqliteStorage;

/// Write session; every write of one session commits together.
pub struct SearchWriter<'a> {
    conn: &'a Connection,
}

impl SearchWriter<'_> {
    /// Open a write session, run `f` in it and commit if it succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first error from `f` or from the transaction; nothing
    /// written in the session is kept in that case.
    pub fn session<F, R>(storage: &mut SqliteStorage, f: F) -> Result<R>
    where
        F: FnOnce(&SearchWriter<'_>) -> Result<R>,
    {
        storage.mutate("search_write", |tx| {
            let writer = SearchWriter { conn: tx };
            f(&writer)
        })
    }

    /// Insert a document, or overwrite the one with the same `search_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    pub fn insert_or_update(&self, doc: &SearchDocument) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO search_titles
                    (search_id, title_id, title, title_norm, premiered_year, ended_year, rating, votes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (search_id) DO UPDATE SET
                    title_id = excluded.title_id,
                    title = excluded.title,
                    title_norm = excluded.title_norm,
                    premiered_year = excluded.premiered_year,
                    ended_year = excluded.ended_year,
                    rating = excluded.rating,
                    votes = excluded.votes",
            )?
            .execute(params![
                doc.search_id,
                doc.title_id,
                doc.title,
                doc.title_norm(),
                doc.premiered_year,
                doc.ended_year,
                doc.rating,
                doc.votes,
            ])?;
        Ok(())
    }
}

/// One search result with enough context to display it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title_id: String,
    /// The alternate title that matched.
    pub title: String,
    pub premiered_year: Option<i64>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
}

/// Read session over the search index.
pub struct SearchReader<'a> {
    conn: &'a Connection,
}

impl<'a> SearchReader<'a> {
    #[must_use]
    pub fn new(storage: &'a SqliteStorage) -> Self {
        Self {
            conn: storage.conn(),
        }
    }

    /// Number of indexed documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM search_titles", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Ranked search for a title.
    ///
    /// The query is normalised like indexed titles and every token must
    /// match. Results are ordered by relevance, then by votes (most first),
    /// optionally restricted to one premiere year. Each title appears once,
    /// at its best-ranked position.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search(&self, query: &str, year: Option<i64>, limit: Option<usize>) -> Result<Vec<SearchHit>> {
        let Some(expr) = match_expression(query) else {
            return Ok(Vec::new());
        };
        let limit = limit.unwrap_or(usize::MAX);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT s.title_id, s.title, s.premiered_year, s.rating, s.votes
             FROM search_titles_fts
             JOIN search_titles s ON s.id = search_titles_fts.rowid
             WHERE search_titles_fts MATCH ?1
               AND (?2 IS NULL OR s.premiered_year = ?2)
             ORDER BY search_titles_fts.rank, s.votes DESC",
        )?;
        let mut rows = stmt.query(params![expr, year])?;

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        while let Some(row) = rows.next()? {
            let title_id: String = row.get(0)?;
            if !seen.insert(title_id.clone()) {
                continue;
            }
            hits.push(SearchHit {
                title_id,
                title: row.get(1)?,
                premiered_year: row.get(2)?,
                rating: row.get(3)?,
                votes: row.get(4)?,
            });
            if hits.len() >= limit {
                break;
            }
        }
        Ok(hits)
    }
}

/// Search for a title and return matching title ids, best first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn title_search(
    storage: &SqliteStorage,
    query: &str,
    year: Option<i64>,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let hits = SearchReader::new(storage).search(query, year, limit)?;
    Ok(hits.into_iter().map(|h| h.title_id).collect())
}

/// FTS5 expression requiring every normalised token, each as a quoted string.
fn match_expression(query: &str) -> Option<String> {
    let tokens: Vec<String> = normalise(query)
        .split_whitespace()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}
