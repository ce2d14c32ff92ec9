//! Search command implementation.

use crate::cli::SearchArgs;
use crate::config::FileConfig;
use crate::error::Result;
use crate::search::{SearchHit, SearchReader};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    count: usize,
    results: Vec<SearchHit>,
}

/// Execute the search command.
///
/// # Errors
///
/// Returns an error if the database is missing or the query fails.
pub fn execute(args: &SearchArgs, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let file = FileConfig::load()?;
    let storage = super::open_existing(db, &file)?;
    let results = SearchReader::new(&storage).search(&args.title, args.year, Some(args.limit))?;

    if crate::is_csv() {
        println!("title_id,title,year,rating,votes");
        for hit in &results {
            println!(
                "{},{},{},{},{}",
                hit.title_id,
                crate::csv_escape(&hit.title),
                opt(hit.premiered_year),
                opt(hit.rating),
                opt(hit.votes)
            );
        }
    } else if json {
        let output = SearchOutput {
            query: &args.title,
            count: results.len(),
            results,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if results.is_empty() {
        println!("No titles found.");
    } else {
        for hit in &results {
            let year = hit
                .premiered_year
                .map_or_else(String::new, |y| format!(" ({y})"));
            let rating = match (hit.rating, hit.votes) {
                (Some(r), Some(v)) => format!("  {r:.1} from {v} votes"),
                _ => String::new(),
            };
            println!("{}  {}{year}{rating}", hit.title_id, hit.title);
        }
    }
    Ok(())
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
