//! Creates referenced dimension rows the first time their key is seen.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::codec::TsvRow;
use super::registry::{ForeignKey, TsvSchema};
use super::types::TsvResult;
use crate::storage::SqliteStorage;

/// Per-run memo of natural-key values confirmed to exist, per referencing field.
///
/// Create one per entity-type import. Values are only remembered in memory;
/// a later run starts empty and relies on create-or-get being idempotent.
#[derive(Debug, Default)]
pub struct ForeignKeyResolver {
    known: HashMap<&'static str, HashSet<String>>,
    created: usize,
}

impl ForeignKeyResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the row named by `value` exists in the referenced table.
    ///
    /// Absent values and values already confirmed in this run are no-ops.
    /// Returns true if a row was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the create-or-get is rejected by storage.
    pub fn ensure(
        &mut self,
        storage: &mut SqliteStorage,
        fk: &ForeignKey,
        value: Option<&str>,
    ) -> TsvResult<bool> {
        let Some(value) = value else {
            return Ok(false);
        };
        let known = self.known.entry(fk.field).or_default();
        if known.contains(value) {
            return Ok(false);
        }

        let created = storage.get_or_create(fk.table, fk.key, value)?;
        if created {
            debug!(
                field = fk.field,
                table = fk.table,
                value,
                "New value for foreign key, created referenced row"
            );
            self.created += 1;
        }
        known.insert(value.to_string());
        Ok(created)
    }

    /// Resolve every natural-key reference of one feed row.
    ///
    /// # Errors
    ///
    /// Returns an error if a create-or-get is rejected by storage.
    pub fn ensure_row(
        &mut self,
        storage: &mut SqliteStorage,
        schema: &TsvSchema,
        row: &TsvRow,
    ) -> TsvResult<()> {
        for fk in schema.foreign_keys {
            let column = schema.field(fk.field).map(|f| f.column);
            let value = column.and_then(|c| row.get(c));
            self.ensure(storage, fk, value)?;
        }
        Ok(())
    }

    /// Rows created by this resolver so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created
    }
}
