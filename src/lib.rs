//! IMDb TSV snapshot import, export and title search.
//!
//! This crate provides the core functionality for the `imdb` CLI tool.
//!
//! # Architecture
//!
//! - [`tsv`] - Feed descriptors, gzip TSV codec, batched import and export
//! - [`storage`] - SQLite database layer
//! - [`search`] - FTS5 search documents, reindexing and queries
//! - [`pipeline`] - Full import and export runs
//! - [`model`] - Data types (Title, Person, Aka, Crew, Episode, Rating)
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling
//!
//! Imports write through a single connection. Running two imports against
//! the same database at the same time is not supported.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod search;
pub mod storage;
pub mod tsv;

pub use error::{Error, Result};

/// Global CSV output flag (set when `--format csv`).
pub static CSV_OUTPUT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if CSV output is requested.
#[inline]
pub fn is_csv() -> bool {
    CSV_OUTPUT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Escape a value for CSV output (wrap in quotes if it contains commas, quotes, or newlines).
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("Carmencita"), "Carmencita");
        assert_eq!(csv_escape("Documentary,Short"), "\"Documentary,Short\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
