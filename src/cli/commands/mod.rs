//! Command implementations.

pub mod completions;
pub mod export;
pub mod import;
pub mod reindex;
pub mod search;
pub mod status;
pub mod titles;
pub mod version;

use crate::config::{FileConfig, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use std::path::PathBuf;

/// Resolve the database path from flag, environment and config file.
pub(crate) fn db_path(explicit: Option<&PathBuf>, file: &FileConfig) -> Result<PathBuf> {
    resolve_db_path(explicit.map(PathBuf::as_path), file)
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Open the database, creating it if needed.
pub(crate) fn open_storage(explicit: Option<&PathBuf>, file: &FileConfig) -> Result<SqliteStorage> {
    SqliteStorage::open(&db_path(explicit, file)?)
}

/// Open a database that must already exist.
pub(crate) fn open_existing(explicit: Option<&PathBuf>, file: &FileConfig) -> Result<SqliteStorage> {
    let path = db_path(explicit, file)?;
    if !path.exists() {
        return Err(Error::NotInitialized { path });
    }
    SqliteStorage::open(&path)
}
