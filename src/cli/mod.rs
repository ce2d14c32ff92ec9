//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::tsv::EntityKind;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// IMDb TSV snapshot import, export and title search
#[derive(Parser, Debug)]
#[command(name = "imdb", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.imdb-tsv/data/imdb.db)
    #[arg(long, global = true, env = "IMDB_TSV_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and import the TSV snapshots, then rebuild the search index
    ///
    /// Do not run two imports against the same database at the same time.
    Import(ImportArgs),

    /// Export stored rows back to gzip TSV files
    Export(ExportArgs),

    /// Rebuild search documents from imported alternate titles
    Reindex(ReindexArgs),

    /// Search titles by name
    Search(SearchArgs),

    /// Show row counts and cached snapshot files
    Status {
        /// Snapshot cache directory to inspect
        #[arg(long)]
        download_dir: Option<PathBuf>,
    },

    /// Browse imported titles
    Titles {
        #[command(subcommand)]
        command: TitlesCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Per-entity skip flags shared by import and export.
#[derive(Args, Debug, Clone, Default)]
pub struct SkipArgs {
    /// Skip titles (title.basics.tsv.gz)
    #[arg(long)]
    pub skip_title_basics: bool,

    /// Skip people (name.basics.tsv.gz)
    #[arg(long)]
    pub skip_name_basics: bool,

    /// Skip alternate titles (title.akas.tsv.gz)
    #[arg(long)]
    pub skip_title_akas: bool,

    /// Skip crew (title.principals.tsv.gz)
    #[arg(long)]
    pub skip_title_principals: bool,

    /// Skip episodes (title.episode.tsv.gz)
    #[arg(long)]
    pub skip_title_episodes: bool,

    /// Skip ratings (title.ratings.tsv.gz)
    #[arg(long)]
    pub skip_title_ratings: bool,
}

impl SkipArgs {
    /// Entity types whose skip flag is set.
    #[must_use]
    pub fn kinds(&self) -> HashSet<EntityKind> {
        [
            ("skip_title_basics", self.skip_title_basics),
            ("skip_name_basics", self.skip_name_basics),
            ("skip_title_akas", self.skip_title_akas),
            ("skip_title_principals", self.skip_title_principals),
            ("skip_title_episodes", self.skip_title_episodes),
            ("skip_title_ratings", self.skip_title_ratings),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .filter_map(|(flag, _)| EntityKind::from_skip_flag(flag))
        .collect()
    }
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Snapshot cache directory
    #[arg(long, env = "IMDB_TSV_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Host serving the snapshots (a leading http:// or https:// is kept)
    #[arg(long, env = "IMDB_TSV_HOST")]
    pub download_host: Option<String>,

    /// Re-download cached files older than this many seconds
    #[arg(long, env = "IMDB_TSV_MAX_AGE")]
    pub max_tsv_age_seconds: Option<u64>,

    /// Records per bulk upsert
    #[arg(long, default_value = "100000", value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,

    /// Do not rebuild the search index afterwards
    #[arg(long)]
    pub no_reindex: bool,

    /// Do not log a random sample record per batch
    #[arg(long)]
    pub no_samples: bool,

    #[command(flatten)]
    pub skip: SkipArgs,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output directory
    #[arg(long, env = "IMDB_TSV_EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Rows between progress log lines
    #[arg(long, default_value = "100000", value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,

    #[command(flatten)]
    pub skip: SkipArgs,
}

#[derive(Args, Debug)]
pub struct ReindexArgs {
    /// Title types to index (repeatable)
    #[arg(long = "type", default_value = "movie")]
    pub types: Vec<String>,

    /// Alternate titles read and written per page
    #[arg(long, default_value = "10000", value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Title text to search for
    pub title: String,

    /// Only titles first released in this year
    #[arg(long)]
    pub year: Option<i64>,

    /// Maximum results
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

// ============================================================================
// Titles Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TitlesCommands {
    /// List titles with filters
    List {
        /// Filter by title type (movie, short, tvSeries, ...)
        #[arg(short = 't', long = "type")]
        title_type: Option<String>,

        /// Only adult (true) or non-adult (false) titles
        #[arg(long)]
        adult: Option<bool>,

        /// Filter by genre
        #[arg(short, long)]
        genre: Option<String>,

        /// Filter by premiere year
        #[arg(short, long)]
        year: Option<i64>,

        /// Substring match on primary or original title
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum titles to return
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show one title with its rating, alternate titles, crew and episodes
    Show {
        /// Title ID (e.g. tt0000001)
        id: String,
    },
}
