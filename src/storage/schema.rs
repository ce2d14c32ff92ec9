//! Database schema definitions.
//!
//! Dimension tables use their natural key as the primary key so that
//! create-or-get is idempotent across runs. Fact tables carry a surrogate
//! rowid (used for insertion-order exports and keyset pagination) plus the
//! uniqueness constraint their upserts resolve conflicts on.

use rusqlite::{Connection, Result};

/// Current schema version for tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Titles
-- ====================

CREATE TABLE IF NOT EXISTS title_type (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS title (
    title_id TEXT PRIMARY KEY,
    title_type_id TEXT DEFAULT 'PLACEHOLDER' REFERENCES title_type(name),
    primary_title TEXT NOT NULL DEFAULT 'PLACEHOLDER',
    original_title TEXT NOT NULL DEFAULT 'PLACEHOLDER',
    is_adult INTEGER,
    premiered INTEGER,
    ended INTEGER,
    runtime_minutes INTEGER,
    genres TEXT NOT NULL DEFAULT '',
    CHECK (premiered IS NULL OR ended IS NULL OR premiered <= ended)
);

CREATE INDEX IF NOT EXISTS idx_title_type ON title(title_type_id);
CREATE INDEX IF NOT EXISTS idx_title_premiered ON title(premiered);

-- ====================
-- People
-- ====================

CREATE TABLE IF NOT EXISTS person (
    person_id TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT 'PLACEHOLDER',
    born INTEGER,
    died INTEGER,
    primary_professions TEXT NOT NULL DEFAULT '',
    known_for_titles TEXT NOT NULL DEFAULT ''
);

-- ====================
-- Alternate titles
-- ====================

CREATE TABLE IF NOT EXISTS aka_type (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS aka_region (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS aka_language (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS aka (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title_id TEXT NOT NULL REFERENCES title(title_id),
    ordering INTEGER NOT NULL,
    aka TEXT NOT NULL DEFAULT '',
    region_id TEXT REFERENCES aka_region(name),
    language_id TEXT REFERENCES aka_language(name),
    aka_type_id TEXT REFERENCES aka_type(name),
    attributes TEXT NOT NULL DEFAULT '',
    is_original_title INTEGER,
    UNIQUE (title_id, ordering)
);

-- ====================
-- Crew
-- ====================

CREATE TABLE IF NOT EXISTS crew_category (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS crew (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title_id TEXT NOT NULL REFERENCES title(title_id),
    ordering INTEGER NOT NULL,
    person_id TEXT REFERENCES person(person_id),
    category_id TEXT REFERENCES crew_category(name),
    job TEXT NOT NULL DEFAULT '',
    characters TEXT NOT NULL DEFAULT '',
    UNIQUE (title_id, ordering)
);

CREATE INDEX IF NOT EXISTS idx_crew_person ON crew(person_id);

-- ====================
-- Episodes
-- ====================

CREATE TABLE IF NOT EXISTS episode (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    episode_title_id TEXT NOT NULL REFERENCES title(title_id),
    show_title_id TEXT NOT NULL REFERENCES title(title_id),
    season_number INTEGER,
    episode_number INTEGER,
    UNIQUE (show_title_id, episode_title_id)
);

CREATE INDEX IF NOT EXISTS idx_episode_episode ON episode(episode_title_id);

-- ====================
-- Ratings
-- ====================

CREATE TABLE IF NOT EXISTS rating (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title_id TEXT NOT NULL UNIQUE REFERENCES title(title_id),
    rating REAL,
    votes INTEGER
);

-- ====================
-- Search
-- ====================

CREATE TABLE IF NOT EXISTS search_titles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_id TEXT NOT NULL UNIQUE,
    title_id TEXT NOT NULL,
    title TEXT NOT NULL,
    title_norm TEXT NOT NULL,
    premiered_year INTEGER,
    ended_year INTEGER,
    rating REAL,
    votes INTEGER
);

CREATE INDEX IF NOT EXISTS idx_search_titles_title ON search_titles(title_id);

CREATE VIRTUAL TABLE IF NOT EXISTS search_titles_fts USING fts5(
    title_norm,
    content='search_titles',
    content_rowid='id',
    tokenize='unicode61 remove_diacritics 2'
);

CREATE TRIGGER IF NOT EXISTS search_titles_ai AFTER INSERT ON search_titles BEGIN
    INSERT INTO search_titles_fts(rowid, title_norm) VALUES (new.id, new.title_norm);
END;

CREATE TRIGGER IF NOT EXISTS search_titles_ad AFTER DELETE ON search_titles BEGIN
    INSERT INTO search_titles_fts(search_titles_fts, rowid, title_norm)
    VALUES ('delete', old.id, old.title_norm);
END;

CREATE TRIGGER IF NOT EXISTS search_titles_au AFTER UPDATE ON search_titles BEGIN
    INSERT INTO search_titles_fts(search_titles_fts, rowid, title_norm)
    VALUES ('delete', old.id, old.title_norm);
    INSERT INTO search_titles_fts(rowid, title_norm) VALUES (new.id, new.title_norm);
END;
";

/// Apply the schema to the database.
///
/// Idempotent: every statement uses `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", "-64000")?; // 64MB cache
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables = tables(&conn);
        for table in [
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
            "search_titles_fts",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_year_order_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute("INSERT INTO title_type (name) VALUES ('movie')", [])
            .unwrap();

        let ok = conn.execute(
            "INSERT INTO title (title_id, title_type_id, premiered, ended)
             VALUES ('tt1', 'movie', 1990, 1995)",
            [],
        );
        assert!(ok.is_ok());

        let bad = conn.execute(
            "INSERT INTO title (title_id, title_type_id, premiered, ended)
             VALUES ('tt2', 'movie', 1995, 1990)",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_search_triggers_keep_fts_in_step() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO search_titles (search_id, title_id, title, title_norm)
             VALUES ('tt1-Alpha', 'tt1', 'Alpha', 'alpha')",
            [],
        )
        .unwrap();
        let hits = |term: &str| -> i64 {
            conn.query_row(
                "SELECT COUNT(*) FROM search_titles_fts WHERE search_titles_fts MATCH ?1",
                [term],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(hits("alpha"), 1);

        conn.execute(
            "UPDATE search_titles SET title_norm = 'beta' WHERE search_id = 'tt1-Alpha'",
            [],
        )
        .unwrap();
        assert_eq!(hits("alpha"), 0);
        assert_eq!(hits("beta"), 1);
    }
}
