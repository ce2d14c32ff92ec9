//! Export command implementation.

use crate::cli::ExportArgs;
use crate::config::{FileConfig, resolve_export_dir};
use crate::error::Result;
use crate::pipeline::{ExportOptions, run_export};
use colored::Colorize;
use std::path::PathBuf;

/// Execute the export command.
///
/// # Errors
///
/// Returns an error if the database is missing or a file cannot be written.
#[allow(clippy::cast_possible_truncation)]
pub fn execute(args: &ExportArgs, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let file = FileConfig::load()?;
    let storage = super::open_existing(db, &file)?;

    let mut opts = ExportOptions::new(resolve_export_dir(args.export_dir.as_deref(), &file)?);
    opts.window = args.batch_size as usize;
    opts.skip = args.skip.kinds();

    let stats = run_export(&storage, &opts)?;

    if json {
        println!("{}", serde_json::to_string(&stats)?);
        return Ok(());
    }

    println!(
        "{} {} rows to {}",
        "Exported".green().bold(),
        stats.total(),
        opts.export_dir.display()
    );
    for entity in &stats.entities {
        println!("  {:<8} {:>10}  {}", entity.entity.as_str(), entity.exported, entity.file);
    }
    for kind in &stats.skipped {
        println!("  {:<8} {}", kind.as_str(), "skipped".dimmed());
    }
    Ok(())
}
