//! Shared types for TSV import and export.

use serde::Serialize;
use std::fmt;

use super::cast::CastError;
use super::registry::EntityKind;

/// Statistics for importing one entity type.
#[derive(Debug, Clone, Serialize)]
pub struct EntityImportStats {
    pub entity: EntityKind,
    pub file: String,
    /// Data lines in the file, from the pre-scan.
    pub total: u64,
    /// Records written (inserted or updated).
    pub records: usize,
    /// Bulk upsert calls issued.
    pub batches: usize,
    /// Dimension rows created on first reference.
    pub dimensions_created: usize,
    pub seconds: f64,
}

impl EntityImportStats {
    /// Records per second over the whole file.
    #[must_use]
    pub fn rate(&self) -> f64 {
        per_second(self.records, self.seconds)
    }
}

/// Statistics for a whole import run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportStats {
    pub entities: Vec<EntityImportStats>,
    pub skipped: Vec<EntityKind>,
    pub downloaded: Vec<String>,
}

impl ImportStats {
    /// Total records written across all entity types.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.entities.iter().map(|e| e.records).sum()
    }

    /// Total dimension rows created across all entity types.
    #[must_use]
    pub fn total_dimensions_created(&self) -> usize {
        self.entities.iter().map(|e| e.dimensions_created).sum()
    }
}

/// Statistics for exporting one entity type.
#[derive(Debug, Clone, Serialize)]
pub struct EntityExportStats {
    pub entity: EntityKind,
    pub file: String,
    /// Rows written to the file.
    pub exported: usize,
    /// Placeholder rows left out.
    pub skipped: usize,
    pub seconds: f64,
}

/// Statistics for a whole export run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExportStats {
    pub entities: Vec<EntityExportStats>,
    pub skipped: Vec<EntityKind>,
}

impl ExportStats {
    /// Total rows written across all files.
    #[must_use]
    pub fn total(&self) -> usize {
        self.entities.iter().map(|e| e.exported).sum()
    }

    /// Returns true if nothing was exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// A feed value that could not be converted, with the row it came from.
#[derive(Debug)]
pub struct RowError {
    pub file: String,
    pub line: usize,
    pub field: &'static str,
    pub column: &'static str,
    pub value: String,
    pub row: String,
    pub source: CastError,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: bad value '{}' in column {} (field {}): {}\n  row: {}",
            self.file, self.line, self.value, self.column, self.field, self.source, self.row
        )
    }
}

/// TSV-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum TsvError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage rejected an operation outside a batch write.
    #[error(transparent)]
    Storage(Box<crate::error::Error>),

    /// Storage rejected a batch; the lines name the rows it held.
    #[error("{file}: batch of lines {first_line}-{last_line} rejected: {source}")]
    Batch {
        file: String,
        first_line: usize,
        last_line: usize,
        source: Box<crate::error::Error>,
    },

    /// A field failed to convert or validate; the whole run stops.
    #[error("{0}")]
    Cast(Box<RowError>),

    /// The header lacks a mapped column.
    #[error("{file}: header has no column '{column}'")]
    MissingColumn { file: String, column: String },

    /// The file has no header line.
    #[error("{0}: file is empty")]
    EmptyFile(String),

    /// Snapshot download failed.
    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },
}

impl From<rusqlite::Error> for TsvError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(Box::new(crate::error::Error::Database(err)))
    }
}

impl From<crate::error::Error> for TsvError {
    fn from(err: crate::error::Error) -> Self {
        match err {
            crate::error::Error::Io(e) => Self::Io(e),
            crate::error::Error::Tsv(e) => e,
            other => Self::Storage(Box::new(other)),
        }
    }
}

/// Result type for TSV operations.
pub type TsvResult<T> = std::result::Result<T, TsvError>;

/// Throughput helper shared by progress logging.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn per_second(count: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_second() {
        assert!((per_second(100, 2.0) - 50.0).abs() < f64::EPSILON);
        assert!(per_second(100, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_export_stats_empty() {
        let mut stats = ExportStats::default();
        assert!(stats.is_empty());
        stats.entities.push(EntityExportStats {
            entity: EntityKind::Title,
            file: "title.basics.tsv.gz".into(),
            exported: 3,
            skipped: 1,
            seconds: 0.1,
        });
        assert_eq!(stats.total(), 3);
        assert!(!stats.is_empty());
    }

    #[test]
    fn test_row_error_display() {
        let source = "x".parse::<i64>().unwrap_err();
        let err = TsvError::Cast(Box::new(RowError {
            file: "title.basics.tsv.gz".into(),
            line: 7,
            field: "premiered",
            column: "startYear",
            value: "x".into(),
            row: "tt1\tx".into(),
            source: CastError::Integer(source),
        }));
        let msg = err.to_string();
        assert!(msg.contains("title.basics.tsv.gz:7"));
        assert!(msg.contains("startYear"));
        assert!(msg.contains("tt1\tx"));
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let err = TsvError::from(rusqlite::Error::InvalidQuery);
        assert!(matches!(
            err,
            TsvError::Storage(ref inner) if matches!(**inner, crate::error::Error::Database(_))
        ));
        assert_eq!(err.to_string().matches("Database error").count(), 1);
    }
}
