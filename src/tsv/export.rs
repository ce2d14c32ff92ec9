//! Export of stored rows back into gzip TSV feed files.

use rusqlite::types::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use super::codec::{TsvWriter, create_gz_writer};
use super::registry::{PLACEHOLDER, TsvSchema};
use super::types::{EntityExportStats, TsvError, TsvResult, per_second};
use crate::storage::SqliteStorage;

/// Rows between progress log lines.
pub const DEFAULT_WINDOW: usize = 100_000;

/// Writes every row of an entity type to its feed file.
pub struct Exporter<'a> {
    storage: &'a SqliteStorage,
    window: usize,
}

impl<'a> Exporter<'a> {
    #[must_use]
    pub fn new(storage: &'a SqliteStorage) -> Self {
        Self {
            storage,
            window: DEFAULT_WINDOW,
        }
    }

    /// Set the progress logging window (at least one row).
    #[must_use]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Export one entity type into `dir`, using the feed's file name.
    ///
    /// The header holds the feed column names; rows come in the descriptor's
    /// order with absent values as `\N`. Placeholder rows are left out. The
    /// file is written under a temporary name and renamed when complete.
    ///
    /// # Errors
    ///
    /// Returns an error if reading storage or writing the file fails.
    pub fn export_entity(&self, schema: &TsvSchema, dir: &Path) -> TsvResult<EntityExportStats> {
        let path = dir.join(schema.filename);
        let tmp = temp_path(&path);
        let result = self.write_file(schema, &tmp);
        match result {
            Ok(stats) => {
                fs::rename(&tmp, &path)?;
                Ok(EntityExportStats {
                    file: path.display().to_string(),
                    ..stats
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    fn write_file(&self, schema: &TsvSchema, tmp: &Path) -> TsvResult<EntityExportStats> {
        let started = Instant::now();
        let total = self.storage.count(schema.table)?;
        debug!(entity = %schema.kind, total, file = %tmp.display(), "Exporting records");

        let mut writer = TsvWriter::new(create_gz_writer(tmp)?);
        writer.write_header(&schema.columns())?;

        let fields = schema.field_names();
        let marker = schema.placeholder_field.and_then(|f| schema.position(f));
        let mut exported = 0usize;
        let mut skipped = 0usize;
        let mut window_started = Instant::now();

        self.storage
            .for_each_row(schema.table, &fields, schema.order_by, |values| {
                if marker.is_some_and(|i| is_placeholder(&values[i])) {
                    skipped += 1;
                    return Ok(());
                }
                writer.write_row(
                    schema
                        .fields
                        .iter()
                        .zip(&values)
                        .map(|(map, value)| map.cast.export(value)),
                )?;
                exported += 1;

                if exported % self.window == 0 {
                    let seconds = window_started.elapsed().as_secs_f64();
                    debug!(
                        entity = %schema.kind,
                        exported,
                        total,
                        seconds = %format!("{seconds:.2}"),
                        per_sec = per_second(self.window, seconds).round(),
                        "Export window done"
                    );
                    window_started = Instant::now();
                }
                Ok::<_, TsvError>(())
            })?;

        let mut out = writer.into_inner()?.finish()?;
        out.flush()?;

        let seconds = started.elapsed().as_secs_f64();
        info!(
            entity = %schema.kind,
            exported,
            skipped,
            seconds = %format!("{seconds:.2}"),
            per_sec = per_second(exported, seconds).round(),
            "Exported {} {} records",
            exported,
            schema.kind
        );
        Ok(EntityExportStats {
            entity: schema.kind,
            file: tmp.display().to_string(),
            exported,
            skipped,
            seconds,
        })
    }
}

fn is_placeholder(value: &Value) -> bool {
    matches!(value, Value::Text(s) if s == PLACEHOLDER)
}

/// `<path>.tmp` next to the final file.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
