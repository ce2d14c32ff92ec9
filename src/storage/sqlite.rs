//! SQLite storage implementation.
//!
//! Writes go through [`SqliteStorage::mutate`], which scopes a closure to one
//! IMMEDIATE transaction. Table and column names passed to the generic
//! operations come from the static entity descriptors, never from user input;
//! they are still quoted as identifiers.

use crate::error::{Error, Result};
use crate::model::{Aka, Crew, Episode, Person, Rating, Title};
use crate::storage::schema::apply_schema;
use crate::tsv::registry::PLACEHOLDER;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction, params_from_iter};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Highest number of bound parameters in one statement.
const MAX_VARIABLES: usize = 32_766;

/// Tables reported by [`SqliteStorage::table_counts`], in import order.
pub const COUNTED_TABLES: [&str; 12] = [
    "title_type",
    "title",
    "person",
    "aka_type",
    "aka_region",
    "aka_language",
    "aka",
    "crew_category",
    "crew",
    "episode",
    "rating",
    "search_titles",
];

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// One alternate title joined with its title and rating, as read by the
/// search reindexer.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSource {
    /// Rowid of the alternate title, used as the pagination cursor.
    pub aka_id: i64,
    pub title_id: String,
    pub aka: String,
    pub premiered: Option<i64>,
    pub ended: Option<i64>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
}

/// Filters for [`SqliteStorage::list_titles`].
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    pub title_type: Option<String>,
    pub is_adult: Option<bool>,
    /// Substring of the genre list.
    pub genre: Option<String>,
    /// Titles running in this year.
    pub year: Option<i64>,
    /// Substring of the primary or original title.
    pub search: Option<String>,
    pub limit: Option<usize>,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the parent directory and the database if needed and applies
    /// the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a closure inside one IMMEDIATE transaction.
    ///
    /// Commits when the closure returns `Ok`; rolls back otherwise.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or an error if the transaction cannot be
    /// started or committed.
    pub fn mutate<F, R, E>(&mut self, op: &str, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&Transaction) -> std::result::Result<R, E>,
        E: From<rusqlite::Error>,
    {
        trace!(op, "begin");
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let result = f(&tx)?;

        tx.commit()?;
        trace!(op, "commit");
        Ok(result)
    }

    // ==================
    // Dimension Operations
    // ==================

    /// Make sure the placeholder title type exists.
    ///
    /// Auto-created titles default to this type, so it must exist before any
    /// entity import runs. Returns true if it was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn ensure_placeholder(&mut self) -> Result<bool> {
        self.get_or_create("title_type", "name", PLACEHOLDER)
    }

    /// Create a row holding only its natural key, unless one exists.
    ///
    /// Every other column takes its default. Returns true if the row was
    /// created by this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn get_or_create(&mut self, table: &str, key: &str, value: &str) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?1) ON CONFLICT DO NOTHING",
            ident(table),
            ident(key)
        );
        let created = self.conn.prepare_cached(&sql)?.execute([value])? == 1;
        Ok(created)
    }

    // ==================
    // Bulk Operations
    // ==================

    /// Insert-or-update a batch of records in one transaction.
    ///
    /// Each record holds one value per entry of `fields`. Rows whose
    /// `conflict` fields match an existing row overwrite every other listed
    /// field; rows with no match are inserted. The batch is executed in
    /// multi-row statements of at most `chunk_size` rows. Returns the number
    /// of records written.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement is rejected; nothing of the batch is
    /// kept in that case.
    pub fn bulk_upsert(
        &mut self,
        table: &str,
        fields: &[&str],
        conflict: &[&str],
        records: &[Vec<Value>],
        chunk_size: usize,
    ) -> Result<usize> {
        if records.is_empty() || fields.is_empty() {
            return Ok(0);
        }
        let chunk_size = chunk_size.clamp(1, MAX_VARIABLES / fields.len());
        let update: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|f| !conflict.contains(f))
            .collect();

        self.mutate("bulk_upsert", |tx| {
            let mut written = 0;
            for chunk in records.chunks(chunk_size) {
                let sql = upsert_sql(table, fields, conflict, &update, chunk.len());
                let mut stmt = tx.prepare_cached(&sql)?;
                stmt.execute(params_from_iter(chunk.iter().flatten()))?;
                written += chunk.len();
            }
            debug!(table, records = written, chunk_size, "Bulk upsert");
            Ok::<_, Error>(written)
        })
    }

    /// Number of rows in a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Row counts of every dataset table.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, u64)>> {
        COUNTED_TABLES
            .iter()
            .map(|table| Ok((*table, self.count(table)?)))
            .collect()
    }

    /// Stream every row of a table in a fixed order.
    ///
    /// `f` receives the values of `fields` for one row at a time; nothing is
    /// buffered beyond the current row.
    ///
    /// # Errors
    ///
    /// Returns the first error from the query or from `f`.
    pub fn for_each_row<F, E>(
        &self,
        table: &str,
        fields: &[&str],
        order_by: &str,
        mut f: F,
    ) -> std::result::Result<(), E>
    where
        F: FnMut(Vec<Value>) -> std::result::Result<(), E>,
        E: From<rusqlite::Error>,
    {
        let columns: Vec<String> = fields.iter().map(|c| ident(c)).collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            columns.join(", "),
            ident(table),
            ident(order_by)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let values = (0..fields.len())
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            f(values)?;
        }
        Ok(())
    }

    // ==================
    // Search Sources
    // ==================

    /// Number of alternate titles whose title type is in `types`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_search_sources(&self, types: &[String]) -> Result<u64> {
        if types.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM aka a
             JOIN title t ON t.title_id = a.title_id
             WHERE a.aka <> '' AND t.title_type_id IN ({})",
            placeholders(1, types.len())
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(types.iter()), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// One page of alternate titles joined with title years and rating.
    ///
    /// Rows are ordered by the alternate title rowid and start after
    /// `after_id`; pass the last `aka_id` of a page to get the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_source_page(
        &self,
        types: &[String],
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<SearchSource>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let n = types.len();
        let sql = format!(
            "SELECT a.id, a.title_id, a.aka, t.premiered, t.ended, r.rating, r.votes
             FROM aka a
             JOIN title t ON t.title_id = a.title_id
             LEFT JOIN rating r ON r.title_id = a.title_id
             WHERE a.aka <> '' AND t.title_type_id IN ({}) AND a.id > ?{}
             ORDER BY a.id
             LIMIT ?{}",
            placeholders(1, n),
            n + 1,
            n + 2
        );
        let mut params: Vec<Value> = types.iter().map(|t| Value::Text(t.clone())).collect();
        params.push(Value::Integer(after_id));
        params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            Ok(SearchSource {
                aka_id: row.get(0)?,
                title_id: row.get(1)?,
                aka: row.get(2)?,
                premiered: row.get(3)?,
                ended: row.get(4)?,
                rating: row.get(5)?,
                votes: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ==================
    // Title Queries
    // ==================

    /// Get a title by natural key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_title(&self, title_id: &str) -> Result<Option<Title>> {
        let sql = format!("SELECT {TITLE_COLUMNS} FROM title WHERE title_id = ?1");
        let title = self
            .conn
            .query_row(&sql, [title_id], map_title)
            .optional()?;
        Ok(title)
    }

    /// Fetch several titles, keeping the order of `ids` and dropping unknown ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn get_titles(&self, ids: &[String]) -> Result<Vec<Title>> {
        let mut titles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(title) = self.get_title(id)? {
                titles.push(title);
            }
        }
        Ok(titles)
    }

    /// List titles with optional filters, ordered by natural key.
    ///
    /// Placeholder titles are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<Title>> {
        let mut sql = format!("SELECT {TITLE_COLUMNS} FROM title WHERE primary_title <> ?1");
        let mut params: Vec<Value> = vec![Value::Text(PLACEHOLDER.to_string())];

        if let Some(ref title_type) = filter.title_type {
            params.push(Value::Text(title_type.clone()));
            let _ = write!(sql, " AND title_type_id = ?{}", params.len());
        }
        if let Some(adult) = filter.is_adult {
            params.push(Value::Integer(i64::from(adult)));
            let _ = write!(sql, " AND is_adult = ?{}", params.len());
        }
        if let Some(ref genre) = filter.genre {
            params.push(Value::Text(format!("%{genre}%")));
            let _ = write!(sql, " AND genres LIKE ?{}", params.len());
        }
        if let Some(year) = filter.year {
            params.push(Value::Integer(year));
            let n = params.len();
            let _ = write!(
                sql,
                " AND premiered <= ?{n} AND COALESCE(ended, premiered) >= ?{n}"
            );
        }
        if let Some(ref search) = filter.search {
            params.push(Value::Text(format!("%{search}%")));
            let n = params.len();
            let _ = write!(
                sql,
                " AND (primary_title LIKE ?{n} OR original_title LIKE ?{n})"
            );
        }
        sql.push_str(" ORDER BY title_id");
        if let Some(limit) = filter.limit {
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            let _ = write!(sql, " LIMIT ?{}", params.len());
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), map_title)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Names of all title types, without the placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn title_types(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM title_type WHERE name <> ?1 ORDER BY name")?;
        let rows = stmt.query_map([PLACEHOLDER], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Get a person by natural key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_person(&self, person_id: &str) -> Result<Option<Person>> {
        let person = self
            .conn
            .query_row(
                "SELECT person_id, name, born, died, primary_professions, known_for_titles
                 FROM person WHERE person_id = ?1",
                [person_id],
                |row| {
                    Ok(Person {
                        person_id: row.get(0)?,
                        name: row.get(1)?,
                        born: row.get(2)?,
                        died: row.get(3)?,
                        primary_professions: row.get(4)?,
                        known_for_titles: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(person)
    }

    /// Rating of a title, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_rating(&self, title_id: &str) -> Result<Option<Rating>> {
        let rating = self
            .conn
            .query_row(
                "SELECT title_id, rating, votes FROM rating WHERE title_id = ?1",
                [title_id],
                |row| {
                    Ok(Rating {
                        title_id: row.get(0)?,
                        rating: row.get(1)?,
                        votes: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(rating)
    }

    /// Alternate titles of a title, in feed order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_akas(&self, title_id: &str) -> Result<Vec<Aka>> {
        let mut stmt = self.conn.prepare(
            "SELECT title_id, ordering, aka, region_id, language_id, aka_type_id,
                    attributes, is_original_title
             FROM aka WHERE title_id = ?1 ORDER BY ordering",
        )?;
        let rows = stmt.query_map([title_id], |row| {
            Ok(Aka {
                title_id: row.get(0)?,
                ordering: row.get(1)?,
                aka: row.get(2)?,
                region: row.get(3)?,
                language: row.get(4)?,
                aka_type: row.get(5)?,
                attributes: row.get(6)?,
                is_original_title: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Principal credits of a title, in feed order, with person names.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_crew(&self, title_id: &str) -> Result<Vec<Crew>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.title_id, c.ordering, c.person_id, p.name, c.category_id,
                    c.job, c.characters
             FROM crew c
             LEFT JOIN person p ON p.person_id = c.person_id
             WHERE c.title_id = ?1 ORDER BY c.ordering",
        )?;
        let rows = stmt.query_map([title_id], |row| {
            Ok(Crew {
                title_id: row.get(0)?,
                ordering: row.get(1)?,
                person_id: row.get(2)?,
                person_name: row.get(3)?,
                category: row.get(4)?,
                job: row.get(5)?,
                characters: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Episodes of a show, by season and episode number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_episodes(&self, show_title_id: &str) -> Result<Vec<Episode>> {
        let mut stmt = self.conn.prepare(
            "SELECT episode_title_id, show_title_id, season_number, episode_number
             FROM episode WHERE show_title_id = ?1
             ORDER BY season_number, episode_number, id",
        )?;
        let rows = stmt.query_map([show_title_id], |row| {
            Ok(Episode {
                episode_title_id: row.get(0)?,
                show_title_id: row.get(1)?,
                season_number: row.get(2)?,
                episode_number: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

const TITLE_COLUMNS: &str = "title_id, title_type_id, primary_title, original_title, is_adult, \
                             premiered, ended, runtime_minutes, genres";

fn map_title(row: &rusqlite::Row<'_>) -> rusqlite::Result<Title> {
    Ok(Title {
        title_id: row.get(0)?,
        title_type: row.get(1)?,
        primary_title: row.get(2)?,
        original_title: row.get(3)?,
        is_adult: row.get(4)?,
        premiered: row.get(5)?,
        ended: row.get(6)?,
        runtime_minutes: row.get(7)?,
        genres: row.get(8)?,
    })
}

/// Quote an SQL identifier.
fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `?start, ?start+1, ...` for `count` parameters.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Multi-row `INSERT .. ON CONFLICT` statement for `rows` records.
fn upsert_sql(
    table: &str,
    fields: &[&str],
    conflict: &[&str],
    update: &[&str],
    rows: usize,
) -> String {
    let columns: Vec<String> = fields.iter().map(|f| ident(f)).collect();
    let row = format!("({})", vec!["?"; fields.len()].join(", "));
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        ident(table),
        columns.join(", "),
        vec![row.as_str(); rows].join(", ")
    );
    let targets: Vec<String> = conflict.iter().map(|f| ident(f)).collect();
    if update.is_empty() {
        let _ = write!(sql, " ON CONFLICT ({}) DO NOTHING", targets.join(", "));
    } else {
        let sets: Vec<String> = update
            .iter()
            .map(|f| format!("{0} = excluded.{0}", ident(f)))
            .collect();
        let _ = write!(
            sql,
            " ON CONFLICT ({}) DO UPDATE SET {}",
            targets.join(", "),
            sets.join(", ")
        );
    }
    sql
}
