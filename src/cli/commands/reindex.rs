//! Reindex command implementation.

use crate::cli::ReindexArgs;
use crate::config::FileConfig;
use crate::error::{Error, Result};
use crate::search::Reindexer;
use std::path::PathBuf;

/// Execute the reindex command.
///
/// # Errors
///
/// Returns an error if no type is given, the database is missing, or a page
/// fails to index.
#[allow(clippy::cast_possible_truncation)]
pub fn execute(args: &ReindexArgs, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let types: Vec<String> = args
        .types
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if types.is_empty() {
        return Err(Error::InvalidArgument("at least one --type is required".into()));
    }

    let file = FileConfig::load()?;
    let mut storage = super::open_existing(db, &file)?;
    let stats = Reindexer::new(&mut storage, types)
        .with_page_size(args.batch_size as usize)
        .run()?;

    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!(
            "Indexed {} of {} alternate titles ({}) in {:.1}s",
            stats.indexed,
            stats.total,
            stats.types.join(", "),
            stats.seconds
        );
    }
    Ok(())
}
