//! Error types for the imdb CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::tsv::TsvError;

/// Result type alias for imdb operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,
    NotInitialized,

    // Not Found (exit 3)
    TitleNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidType,

    // Feed data (exit 5)
    DataError,

    // Transfer (exit 6)
    DownloadError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::TitleNotFound => "TITLE_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidType => "INVALID_TYPE",
            Self::DataError => "DATA_ERROR",
            Self::DownloadError => "DOWNLOAD_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
        }
    }

    /// Category-based exit code (2-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::DatabaseError | Self::NotInitialized => 2,
            Self::TitleNotFound => 3,
            Self::InvalidArgument | Self::InvalidType => 4,
            Self::DataError => 5,
            Self::DownloadError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying the same command can succeed.
    ///
    /// True for corrected input and for transient transfer or lock errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::InvalidType | Self::DownloadError | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in imdb operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No database at {path}")]
    NotInitialized { path: PathBuf },

    #[error("Title not found: {id}")]
    TitleNotFound { id: String },

    #[error("Invalid title type: {0}")]
    InvalidType(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Tsv(#[from] TsvError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::TitleNotFound { .. } => ErrorCode::TitleNotFound,
            Self::InvalidType(_) => ErrorCode::InvalidType,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Tsv(e) => match e {
                TsvError::Io(_) => ErrorCode::IoError,
                TsvError::Storage(inner) | TsvError::Batch { source: inner, .. } => {
                    inner.error_code()
                }
                TsvError::Cast(_) | TsvError::MissingColumn { .. } | TsvError::EmptyFile(_) => {
                    ErrorCode::DataError
                }
                TsvError::Download { .. } => ErrorCode::DownloadError,
            },
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized { path } => Some(format!(
                "Nothing imported into {} yet. Run `imdb import` first.",
                path.display()
            )),

            Self::TitleNotFound { id } => Some(format!(
                "No title with ID '{id}'. Use `imdb search <title>` to find one."
            )),

            Self::InvalidType(_) => Some(
                "Valid types: movie, short, tvMovie, tvSeries, tvMiniSeries, tvSpecial, \
                 tvShort, tvEpisode, video, videoGame"
                    .to_string(),
            ),

            Self::Tsv(TsvError::Download { .. }) => Some(
                "Check the download host (--download-host or IMDB_TSV_HOST) \
                 and your network connection."
                    .to_string(),
            ),

            Self::Tsv(TsvError::Cast(_) | TsvError::MissingColumn { .. }) => Some(
                "The snapshot file looks corrupt or truncated. \
                 Delete it from the download directory to fetch a fresh copy."
                    .to_string(),
            ),

            Self::Config(_) => Some(
                "Check ~/.imdb-tsv/config.json and the IMDB_TSV_* environment variables."
                    .to_string(),
            ),

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Tsv(_)
            | Self::InvalidArgument(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(
            Error::TitleNotFound { id: "tt1".into() }.exit_code(),
            3
        );
        assert_eq!(Error::InvalidArgument("x".into()).exit_code(), 4);
        assert_eq!(
            Error::Tsv(TsvError::EmptyFile("f".into())).exit_code(),
            5
        );
        assert_eq!(
            Error::Tsv(TsvError::Download {
                url: "u".into(),
                message: "m".into()
            })
            .exit_code(),
            6
        );
        assert_eq!(Error::Config("x".into()).exit_code(), 7);
    }

    #[test]
    fn test_structured_json() {
        let err = Error::TitleNotFound { id: "tt404".into() };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "TITLE_NOT_FOUND");
        assert_eq!(json["error"]["exit_code"], 3);
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].as_str().unwrap().contains("tt404"));
    }

    #[test]
    fn test_tsv_io_maps_to_io() {
        let err = Error::from(TsvError::Io(std::io::Error::other("disk")));
        assert_eq!(err.error_code(), ErrorCode::IoError);
    }

    #[test]
    fn test_tsv_storage_keeps_database_code() {
        let err = Error::from(TsvError::Batch {
            file: "title.basics.tsv.gz".into(),
            first_line: 2,
            last_line: 9,
            source: Box::new(Error::Database(rusqlite::Error::InvalidQuery)),
        });
        assert_eq!(err.error_code(), ErrorCode::DatabaseError);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("lines 2-9"));
    }
}
