//! Full import and export runs.
//!
//! An import run makes sure the placeholder dimension row exists, then walks
//! every entity type in [`EntityKind::ALL`] order: skipped types are left
//! alone, the others get a fresh snapshot file (downloaded when missing or
//! stale) and are imported. Finally the search documents are rebuilt.
//!
//! Two runs must not target the same database at the same time.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::error::Result;
use crate::search::reindex::{DEFAULT_PAGE_SIZE, DEFAULT_TYPES, ReindexStats, Reindexer};
use crate::storage::SqliteStorage;
use crate::tsv::export::DEFAULT_WINDOW;
use crate::tsv::fetch::{self, DEFAULT_HOST, DEFAULT_MAX_AGE};
use crate::tsv::{EntityKind, ExportStats, Exporter, ImportConfig, ImportStats, Importer};

/// Settings for [`run_import`].
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub download_dir: PathBuf,
    pub host: String,
    pub max_age: Duration,
    pub skip: HashSet<EntityKind>,
    pub import: ImportConfig,
    /// Rebuild search documents after importing.
    pub reindex: bool,
    pub reindex_types: Vec<String>,
    pub reindex_page_size: usize,
}

impl ImportOptions {
    #[must_use]
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            download_dir,
            host: DEFAULT_HOST.to_string(),
            max_age: DEFAULT_MAX_AGE,
            skip: HashSet::new(),
            import: ImportConfig::default(),
            reindex: true,
            reindex_types: DEFAULT_TYPES.iter().map(ToString::to_string).collect(),
            reindex_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Settings for [`run_export`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub export_dir: PathBuf,
    pub window: usize,
    pub skip: HashSet<EntityKind>,
}

impl ExportOptions {
    #[must_use]
    pub fn new(export_dir: PathBuf) -> Self {
        Self {
            export_dir,
            window: DEFAULT_WINDOW,
            skip: HashSet::new(),
        }
    }
}

/// Run a full import, followed by a search reindex unless disabled.
///
/// Entity types imported before a failure stay committed.
///
/// # Errors
///
/// Returns the first download, parse or storage error.
pub fn run_import(
    storage: &mut SqliteStorage,
    opts: &ImportOptions,
) -> Result<(ImportStats, Option<ReindexStats>)> {
    if storage.ensure_placeholder()? {
        info!("Created placeholder title type");
    }

    let mut stats = ImportStats::default();
    for kind in EntityKind::ALL {
        let schema = kind.schema();
        if opts.skip.contains(&kind) {
            info!(entity = %kind, flag = schema.skip_flag, "Skipping");
            stats.skipped.push(kind);
            continue;
        }

        let (path, downloaded) =
            fetch::ensure_file(&opts.download_dir, &opts.host, schema.filename, opts.max_age)?;
        if downloaded {
            stats.downloaded.push(schema.filename.to_string());
        }

        let entity = Importer::new(storage)
            .with_config(opts.import.clone())
            .import_file(schema, &path)?;
        stats.entities.push(entity);
    }
    info!(
        records = stats.total_records(),
        dimensions_created = stats.total_dimensions_created(),
        skipped = stats.skipped.len(),
        "Import finished"
    );

    let reindex = if opts.reindex {
        let result = Reindexer::new(storage, opts.reindex_types.clone())
            .with_page_size(opts.reindex_page_size)
            .run()?;
        Some(result)
    } else {
        None
    };
    Ok((stats, reindex))
}

/// Export every entity type not skipped into `opts.export_dir`.
///
/// # Errors
///
/// Returns the first storage or write error.
pub fn run_export(storage: &SqliteStorage, opts: &ExportOptions) -> Result<ExportStats> {
    let exporter = Exporter::new(storage).with_window(opts.window);
    let mut stats = ExportStats::default();
    for kind in EntityKind::ALL {
        if opts.skip.contains(&kind) {
            info!(entity = %kind, flag = kind.schema().skip_flag, "Skipping");
            stats.skipped.push(kind);
            continue;
        }
        stats
            .entities
            .push(exporter.export_entity(kind.schema(), &opts.export_dir)?);
    }
    info!(
        exported = stats.total(),
        dir = %opts.export_dir.display(),
        "Export finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::title_search;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_gz(dir: &Path, name: &str, content: &str) {
        let mut out = crate::tsv::codec::create_gz_writer(&dir.join(name)).unwrap();
        out.write_all(content.as_bytes()).unwrap();
        out.finish().unwrap();
    }

    fn seed(dir: &Path) {
        write_gz(
            dir,
            "title.basics.tsv.gz",
            "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres\n\
             tt0000012\tmovie\tThe Arrival of a Train\tL'arrivée d'un train à La Ciotat\t0\t1896\t\\N\t1\tDocumentary,Short\n",
        );
        write_gz(
            dir,
            "title.akas.tsv.gz",
            "titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle\n\
             tt0000012\t1\tThe Arrival of a Train\tUS\t\\N\timdbDisplay\t\\N\t0\n",
        );
        write_gz(
            dir,
            "title.ratings.tsv.gz",
            "tconst\taverageRating\tnumVotes\ntt0000012\t7.4\t13000\n",
        );
    }

    fn skip(kinds: &[EntityKind]) -> HashSet<EntityKind> {
        kinds.iter().copied().collect()
    }

    #[test]
    fn test_run_import_with_cached_files() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        let mut storage = SqliteStorage::open_memory().unwrap();

        let mut opts = ImportOptions::new(dir.path().to_path_buf());
        opts.host = "unused.invalid".into();
        opts.skip = skip(&[EntityKind::Person, EntityKind::Crew, EntityKind::Episode]);

        let (stats, reindex) = run_import(&mut storage, &opts).unwrap();
        assert_eq!(stats.entities.len(), 3);
        assert_eq!(stats.skipped.len(), 3);
        assert!(stats.downloaded.is_empty());
        assert_eq!(stats.total_records(), 3);

        let reindex = reindex.unwrap();
        assert_eq!(reindex.indexed, 1);
        assert_eq!(
            title_search(&storage, "arrival train", Some(1896), None).unwrap(),
            ["tt0000012"]
        );
    }

    #[test]
    fn test_run_import_without_reindex() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        let mut storage = SqliteStorage::open_memory().unwrap();

        let mut opts = ImportOptions::new(dir.path().to_path_buf());
        opts.reindex = false;
        opts.skip = skip(&[EntityKind::Person, EntityKind::Crew, EntityKind::Episode]);

        let (_, reindex) = run_import(&mut storage, &opts).unwrap();
        assert!(reindex.is_none());
        assert_eq!(storage.count("search_titles").unwrap(), 0);
        assert_eq!(storage.count("title").unwrap(), 1);
    }

    #[test]
    fn test_run_import_missing_file_fails_download() {
        let dir = TempDir::new().unwrap();
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut opts = ImportOptions::new(dir.path().to_path_buf());
        opts.host = "http://127.0.0.1:9".into();
        opts.skip = EntityKind::ALL.into_iter().skip(1).collect();

        let err = run_import(&mut storage, &opts).unwrap_err();
        assert_eq!(err.error_code().as_str(), "DOWNLOAD_ERROR");
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_run_export_skips() {
        let dir = TempDir::new().unwrap();
        seed(dir.path());
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut import = ImportOptions::new(dir.path().to_path_buf());
        import.reindex = false;
        import.skip = skip(&[EntityKind::Person, EntityKind::Crew, EntityKind::Episode]);
        run_import(&mut storage, &import).unwrap();

        let out = dir.path().join("export");
        let mut opts = ExportOptions::new(out.clone());
        opts.skip = skip(&[EntityKind::Aka]);
        let stats = run_export(&storage, &opts).unwrap();

        assert_eq!(stats.entities.len(), 5);
        assert_eq!(stats.skipped, [EntityKind::Aka]);
        assert_eq!(stats.total(), 2);
        assert!(out.join("title.basics.tsv.gz").exists());
        assert!(out.join("name.basics.tsv.gz").exists());
        assert!(!out.join("title.akas.tsv.gz").exists());
    }
}
