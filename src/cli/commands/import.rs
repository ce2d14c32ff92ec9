//! Import command implementation.

use crate::cli::ImportArgs;
use crate::config::{FileConfig, resolve_download_dir, resolve_host, resolve_max_age};
use crate::error::Result;
use crate::pipeline::{ImportOptions, run_import};
use crate::search::reindex::{ReindexStats, minsec};
use crate::tsv::{ImportConfig, ImportStats};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ImportOutput<'a> {
    import: &'a ImportStats,
    reindex: Option<&'a ReindexStats>,
}

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if configuration is invalid or any download, parse or
/// storage step fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn execute(args: &ImportArgs, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let file = FileConfig::load()?;
    let mut storage = super::open_storage(db, &file)?;

    let mut opts = ImportOptions::new(resolve_download_dir(args.download_dir.as_deref(), &file)?);
    opts.host = resolve_host(args.download_host.as_deref(), &file);
    opts.max_age = resolve_max_age(args.max_tsv_age_seconds, &file)?;
    opts.skip = args.skip.kinds();
    opts.import = ImportConfig {
        batch_size: args.batch_size as usize,
        log_samples: !args.no_samples,
        ..ImportConfig::default()
    };
    opts.reindex = !args.no_reindex;

    let (stats, reindex) = run_import(&mut storage, &opts)?;

    if json {
        let output = ImportOutput {
            import: &stats,
            reindex: reindex.as_ref(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Import complete".green().bold());
    for file in &stats.downloaded {
        println!("  downloaded {file}");
    }
    for entity in &stats.entities {
        let (m, s) = minsec(entity.seconds.round() as u64);
        println!(
            "  {:<8} {:>10} records {:>8} new dimension rows  {m}m {s}s",
            entity.entity.as_str(),
            entity.records,
            entity.dimensions_created,
        );
    }
    for kind in &stats.skipped {
        println!("  {:<8} {}", kind.as_str(), "skipped".dimmed());
    }
    if let Some(r) = reindex {
        println!(
            "  search   {:>10} documents ({})",
            r.indexed,
            r.types.join(", ")
        );
    }
    Ok(())
}
