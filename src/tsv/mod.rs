//! IMDb TSV snapshot import and export.
//!
//! This module handles:
//! - Per-entity descriptors (file, column mapping, casts, references)
//! - Streaming gzip TSV reading and writing
//! - Creating referenced dimension rows on first sight
//! - Batched, idempotent upserts
//! - Exports back to the feed format
//! - Snapshot download and cache expiry
//!
//! Entity types are processed in the order of [`EntityKind::ALL`]; later
//! types reference earlier ones. Running two imports against one database
//! at the same time is not supported.

pub mod cast;
pub mod codec;
pub mod export;
pub mod fetch;
pub mod import;
pub mod registry;
pub mod resolver;
pub mod types;

pub use cast::{Cast, CastError};
pub use export::Exporter;
pub use import::{ImportConfig, Importer};
pub use registry::{EntityKind, TsvSchema};
pub use resolver::ForeignKeyResolver;
pub use types::{
    EntityExportStats, EntityImportStats, ExportStats, ImportStats, RowError, TsvError, TsvResult,
};
