//! Batch import of one TSV feed file into storage.
//!
//! Rows are streamed, their natural-key references resolved, their fields
//! cast, and the resulting records collected into fixed-size batches. Each
//! full batch is written with one bulk upsert, so re-importing the same file
//! updates rows in place instead of duplicating them.

use rand::seq::IndexedRandom;
use rusqlite::types::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use super::cast::CastError;
use super::codec::{TsvReader, TsvRow, count_records, open_gz_reader};
use super::registry::{FieldMap, TsvSchema};
use super::resolver::ForeignKeyResolver;
use super::types::{EntityImportStats, RowError, TsvError, TsvResult, per_second};
use crate::storage::SqliteStorage;

/// Records per bulk upsert.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Rows per multi-row insert statement within a bulk upsert.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;

/// Import tuning.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub chunk_size: usize,
    /// Log one random record of every flushed batch.
    pub log_samples: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_samples: true,
        }
    }
}

/// Imports feed files described by entity descriptors.
pub struct Importer<'a> {
    storage: &'a mut SqliteStorage,
    config: ImportConfig,
}

/// Running state of one file import.
struct Progress {
    total: u64,
    imported: usize,
    batches: usize,
}

/// Records waiting for the next bulk upsert.
struct Batch {
    records: Vec<Vec<Value>>,
    started: Instant,
    first_line: usize,
    last_line: usize,
}

impl Batch {
    fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            started: Instant::now(),
            first_line: 0,
            last_line: 0,
        }
    }

    fn push(&mut self, record: Vec<Value>, line: usize) {
        if self.records.is_empty() {
            self.started = Instant::now();
            self.first_line = line;
        }
        self.last_line = line;
        self.records.push(record);
    }
}

impl<'a> Importer<'a> {
    /// Create a new importer.
    pub fn new(storage: &'a mut SqliteStorage) -> Self {
        Self {
            storage,
            config: ImportConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Import one gzip TSV file.
    ///
    /// The file is read twice: once to count lines for progress reporting,
    /// then to stream the rows. Batches flushed before an error stay
    /// committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the header lacks a mapped
    /// column, a value fails to convert, or storage rejects a write.
    pub fn import_file(&mut self, schema: &TsvSchema, path: &Path) -> TsvResult<EntityImportStats> {
        let started = Instant::now();
        let file = path.display().to_string();
        self.storage.ensure_placeholder()?;

        let total = count_records(open_gz_reader(path)?)?.saturating_sub(1);
        info!(file = %file, records = total, "Importing file");

        let reader = TsvReader::new(open_gz_reader(path)?, &file)?;
        let positions = column_positions(schema, &reader, &file)?;
        let fields = schema.field_names();
        let batch_size = self.config.batch_size.max(1);

        let mut resolver = ForeignKeyResolver::new();
        let mut progress = Progress {
            total,
            imported: 0,
            batches: 0,
        };
        let mut batch = Batch::new(batch_size.min(DEFAULT_BATCH_SIZE));

        for row in reader {
            let row = row?;
            if batch.records.is_empty() {
                debug!(entity = %schema.kind, batch_size, "Starting new batch");
            }
            let record = build_record(schema, &positions, &row, &file)?;
            resolver.ensure_row(self.storage, schema, &row)?;
            batch.push(record, row.line());

            if batch.records.len() >= batch_size {
                self.flush(schema, &fields, &batch, &file, &mut progress)?;
                batch.records.clear();
            }
        }
        if !batch.records.is_empty() {
            self.flush(schema, &fields, &batch, &file, &mut progress)?;
        }

        let seconds = started.elapsed().as_secs_f64();
        let stats = EntityImportStats {
            entity: schema.kind,
            file,
            total,
            records: progress.imported,
            batches: progress.batches,
            dimensions_created: resolver.created(),
            seconds,
        };
        info!(
            entity = %schema.kind,
            records = stats.records,
            dimensions_created = stats.dimensions_created,
            seconds = %format!("{seconds:.2}"),
            per_sec = stats.rate().round(),
            "Done! Imported or updated {} {} records",
            stats.records,
            schema.kind
        );
        Ok(stats)
    }

    fn flush(
        &mut self,
        schema: &TsvSchema,
        fields: &[&str],
        batch: &Batch,
        file: &str,
        progress: &mut Progress,
    ) -> TsvResult<()> {
        self.storage
            .bulk_upsert(
                schema.table,
                fields,
                schema.unique_fields,
                &batch.records,
                self.config.chunk_size,
            )
            .map_err(|source| TsvError::Batch {
                file: file.to_string(),
                first_line: batch.first_line,
                last_line: batch.last_line,
                source: Box::new(source),
            })?;
        let seconds = batch.started.elapsed().as_secs_f64();
        let batch = &batch.records;
        progress.imported += batch.len();
        progress.batches += 1;

        info!(
            entity = %schema.kind,
            batch = batch.len(),
            seconds = %format!("{seconds:.2}"),
            per_sec = per_second(batch.len(), seconds).round(),
            "Imported {:.2}% ({} out of {} total records)",
            percent(progress.imported, progress.total),
            progress.imported,
            progress.total
        );

        if self.config.log_samples {
            if let Some(record) = batch.choose(&mut rand::rng()) {
                info!(entity = %schema.kind, "Random sample: {}", describe(schema, record));
            }
        }
        Ok(())
    }
}

/// Header position of every mapped column, in field order.
fn column_positions<R: std::io::BufRead>(
    schema: &TsvSchema,
    reader: &TsvReader<R>,
    file: &str,
) -> TsvResult<Vec<usize>> {
    schema
        .fields
        .iter()
        .map(|f| {
            reader.position(f.column).ok_or_else(|| TsvError::MissingColumn {
                file: file.to_string(),
                column: f.column.to_string(),
            })
        })
        .collect()
}

/// Cast one feed row into storage values, in field order.
fn build_record(
    schema: &TsvSchema,
    positions: &[usize],
    row: &TsvRow,
    file: &str,
) -> TsvResult<Vec<Value>> {
    let record = schema
        .fields
        .iter()
        .zip(positions)
        .map(|(map, &pos)| match row.value(pos) {
            None => Ok(map.cast.absent(schema.is_reference(map.field))),
            Some(raw) => map.cast.import(raw).map_err(|source| cast_error(map, raw, row, file, source)),
        })
        .collect::<TsvResult<Vec<_>>>()?;
    check_order(schema, positions, &record, row, file)?;
    Ok(record)
}

/// Reject a row whose upper bound field is below its lower bound field.
fn check_order(
    schema: &TsvSchema,
    positions: &[usize],
    record: &[Value],
    row: &TsvRow,
    file: &str,
) -> TsvResult<()> {
    let Some((lower_field, upper_field)) = schema.ordered_fields else {
        return Ok(());
    };
    let (Some(lo), Some(hi)) = (schema.position(lower_field), schema.position(upper_field)) else {
        return Ok(());
    };
    if let (Value::Integer(lower), Value::Integer(value)) = (&record[lo], &record[hi]) {
        if value < lower {
            let raw = row.value(positions[hi]).unwrap_or_default();
            let source = CastError::OutOfOrder {
                lower_field,
                lower: *lower,
                value: *value,
            };
            return Err(cast_error(&schema.fields[hi], raw, row, file, source));
        }
    }
    Ok(())
}

fn cast_error(
    map: &FieldMap,
    raw: &str,
    row: &TsvRow,
    file: &str,
    source: CastError,
) -> TsvError {
    TsvError::Cast(Box::new(RowError {
        file: file.to_string(),
        line: row.line(),
        field: map.field,
        column: map.column,
        value: raw.to_string(),
        row: row.raw(),
        source,
    }))
}

#[allow(clippy::cast_precision_loss)]
fn percent(done: usize, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        (done as f64 / total as f64 * 100.0).min(100.0)
    }
}

/// `field=value` pairs of a record, for the sample log.
fn describe(schema: &TsvSchema, record: &[Value]) -> String {
    schema
        .fields
        .iter()
        .zip(record)
        .map(|(map, value)| {
            let text = map.cast.export(value);
            format!("{}={}", map.field, text.as_deref().unwrap_or("\\N"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
