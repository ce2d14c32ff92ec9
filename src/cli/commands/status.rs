//! Status command implementation.

use crate::config::{FileConfig, resolve_download_dir, resolve_max_age};
use crate::error::Result;
use crate::search::reindex::minsec;
use crate::tsv::EntityKind;
use crate::tsv::fetch::file_age;
use serde::Serialize;
use std::path::PathBuf;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    db_path: String,
    tables: Vec<TableCount>,
    download_dir: String,
    max_age_seconds: u64,
    files: Vec<CachedFile>,
}

#[derive(Serialize)]
struct TableCount {
    table: &'static str,
    rows: u64,
}

#[derive(Serialize)]
struct CachedFile {
    entity: EntityKind,
    filename: &'static str,
    present: bool,
    age_seconds: Option<u64>,
    stale: bool,
}

/// Execute status command.
///
/// # Errors
///
/// Returns an error if the database is missing or cannot be read.
pub fn execute(download_dir: Option<&PathBuf>, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let file = FileConfig::load()?;
    let db_path = super::db_path(db, &file)?;
    let storage = super::open_existing(db, &file)?;
    let download_dir = resolve_download_dir(download_dir.map(PathBuf::as_path), &file)?;
    let max_age = resolve_max_age(None, &file)?;

    let tables = storage
        .table_counts()?
        .into_iter()
        .map(|(table, rows)| TableCount { table, rows })
        .collect::<Vec<_>>();

    let mut files = Vec::with_capacity(EntityKind::ALL.len());
    for kind in EntityKind::ALL {
        let filename = kind.schema().filename;
        let path = download_dir.join(filename);
        let age = if path.exists() {
            Some(file_age(&path)?.as_secs())
        } else {
            None
        };
        files.push(CachedFile {
            entity: kind,
            filename,
            present: age.is_some(),
            age_seconds: age,
            stale: age.is_some_and(|a| a > max_age.as_secs()),
        });
    }

    let output = StatusOutput {
        db_path: db_path.display().to_string(),
        tables,
        download_dir: download_dir.display().to_string(),
        max_age_seconds: max_age.as_secs(),
        files,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("IMDb TSV Status");
    println!("===============");
    println!();
    println!("Database: {}", output.db_path);
    for t in &output.tables {
        println!("  {:<14} {:>12}", t.table, t.rows);
    }
    println!();
    println!("Snapshot cache: {}", output.download_dir);
    for f in &output.files {
        match f.age_seconds {
            Some(age) => {
                let (minutes, seconds) = minsec(age);
                let stale = if f.stale { "  (stale)" } else { "" };
                println!(
                    "  {:<26} {}h {:02}m {:02}s old{stale}",
                    f.filename,
                    minutes / 60,
                    minutes % 60,
                    seconds
                );
            }
            None => println!("  {:<26} not downloaded", f.filename),
        }
    }

    Ok(())
}
