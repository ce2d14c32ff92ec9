//! Configuration management.
//!
//! Every setting resolves in the same order:
//! 1. Explicit CLI flag
//! 2. `IMDB_TSV_*` environment variable
//! 3. `~/.imdb-tsv/config.json`
//! 4. Built-in default

use crate::error::{Error, Result};
use crate::tsv::fetch::{DEFAULT_HOST, DEFAULT_MAX_AGE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB: &str = "IMDB_TSV_DB";
pub const ENV_DOWNLOAD_DIR: &str = "IMDB_TSV_DOWNLOAD_DIR";
pub const ENV_EXPORT_DIR: &str = "IMDB_TSV_EXPORT_DIR";
pub const ENV_HOST: &str = "IMDB_TSV_HOST";
pub const ENV_MAX_AGE: &str = "IMDB_TSV_MAX_AGE";

/// Contents of `config.json`. All keys are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub db: Option<String>,
    pub download_dir: Option<String>,
    pub export_dir: Option<String>,
    pub download_host: Option<String>,
    pub max_tsv_age_seconds: Option<u64>,
}

impl FileConfig {
    /// Load the config file from the global directory.
    ///
    /// A missing file yields the empty config.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a config file from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
    }
}

/// Global directory: `~/.imdb-tsv`.
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".imdb-tsv"))
}

/// Path of the optional config file.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("config.json"))
}

/// Per-user cache directory, falling back to the global directory.
fn cache_dir() -> Option<PathBuf> {
    directories::BaseDirs::new()
        .map(|b| b.cache_dir().to_path_buf())
        .or_else(global_dir)
}

/// Expand a leading `~` against the home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf());
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(&rest[1..])
        }
        _ => PathBuf::from(path),
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// First non-empty value of flag, env and file, in that order.
fn pick(explicit: Option<&str>, env: Option<String>, file: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or(env)
        .or_else(|| file.map(str::to_string))
        .filter(|v| !v.trim().is_empty())
}

/// Resolve the database path.
///
/// Falls back to `~/.imdb-tsv/data/imdb.db`. Returns `None` only if no home
/// directory can be determined.
#[must_use]
pub fn resolve_db_path(explicit: Option<&Path>, file: &FileConfig) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    pick(None, env_value(ENV_DB), file.db.as_deref())
        .map(|p| expand_tilde(&p))
        .or_else(|| global_dir().map(|dir| dir.join("data").join("imdb.db")))
}

/// Resolve the snapshot cache directory.
///
/// # Errors
///
/// Returns `Error::Config` if no default location can be determined.
pub fn resolve_download_dir(explicit: Option<&Path>, file: &FileConfig) -> Result<PathBuf> {
    resolve_dir(
        explicit,
        ENV_DOWNLOAD_DIR,
        file.download_dir.as_deref(),
        "imdb-tsv-data",
    )
}

/// Resolve the export output directory.
///
/// # Errors
///
/// Returns `Error::Config` if no default location can be determined.
pub fn resolve_export_dir(explicit: Option<&Path>, file: &FileConfig) -> Result<PathBuf> {
    resolve_dir(
        explicit,
        ENV_EXPORT_DIR,
        file.export_dir.as_deref(),
        "imdb-tsv-export",
    )
}

fn resolve_dir(
    explicit: Option<&Path>,
    env: &str,
    file: Option<&str>,
    default_name: &str,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = pick(None, env_value(env), file) {
        return Ok(expand_tilde(&path));
    }
    cache_dir()
        .map(|dir| dir.join(default_name))
        .ok_or_else(|| Error::Config("Could not determine cache directory".into()))
}

/// Resolve the snapshot download host.
#[must_use]
pub fn resolve_host(explicit: Option<&str>, file: &FileConfig) -> String {
    pick(explicit, env_value(ENV_HOST), file.download_host.as_deref())
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// Resolve the maximum age of a cached snapshot.
///
/// # Errors
///
/// Returns `Error::Config` if the environment variable is not a number of seconds.
pub fn resolve_max_age(explicit: Option<u64>, file: &FileConfig) -> Result<Duration> {
    if let Some(seconds) = explicit {
        return Ok(Duration::from_secs(seconds));
    }
    if let Some(raw) = env_value(ENV_MAX_AGE) {
        let seconds = raw.trim().parse::<u64>().map_err(|_| {
            Error::Config(format!("{ENV_MAX_AGE} must be a number of seconds, got '{raw}'"))
        })?;
        return Ok(Duration::from_secs(seconds));
    }
    Ok(file
        .max_tsv_age_seconds
        .map_or(DEFAULT_MAX_AGE, Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/imdb.db");
        let file = FileConfig {
            db: Some("/from/file.db".into()),
            ..FileConfig::default()
        };
        assert_eq!(resolve_db_path(Some(&explicit), &file), Some(explicit));
    }

    #[test]
    fn test_pick_order() {
        assert_eq!(
            pick(Some("flag"), Some("env".into()), Some("file")).as_deref(),
            Some("flag")
        );
        assert_eq!(pick(None, Some("env".into()), Some("file")).as_deref(), Some("env"));
        assert_eq!(pick(None, None, Some("file")).as_deref(), Some("file"));
        assert_eq!(pick(None, None, Some("  ")), None);
        assert_eq!(pick(None, None, None), None);
    }

    #[test]
    fn test_global_dir_returns_some() {
        let dir = global_dir().unwrap();
        assert!(dir.ends_with(".imdb-tsv"));
        assert!(config_path().unwrap().ends_with("config.json"));
    }

    #[test]
    fn test_expand_tilde() {
        let home = directories::BaseDirs::new().unwrap().home_dir().to_path_buf();
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("~/data"), home.join("data"));
        assert_eq!(expand_tilde("/abs/data"), PathBuf::from("/abs/data"));
        assert_eq!(expand_tilde("~other/data"), PathBuf::from("~other/data"));
    }

    #[test]
    fn test_explicit_values_win() {
        let file = FileConfig {
            download_host: Some("mirror.example".into()),
            max_tsv_age_seconds: Some(60),
            ..FileConfig::default()
        };
        assert_eq!(resolve_host(Some("flag.example"), &file), "flag.example");
        assert_eq!(
            resolve_max_age(Some(5), &file).unwrap(),
            Duration::from_secs(5)
        );
        let dir = PathBuf::from("/tmp/explicit");
        assert_eq!(resolve_download_dir(Some(&dir), &file).unwrap(), dir);
        assert_eq!(resolve_export_dir(Some(&dir), &file).unwrap(), dir);
    }

    #[test]
    fn test_load_from() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(FileConfig::load_from(&path).unwrap(), FileConfig::default());

        fs::write(&path, r#"{"download_host": "mirror.example", "max_tsv_age_seconds": 60}"#)
            .unwrap();
        let config = FileConfig::load_from(&path).unwrap();
        assert_eq!(config.download_host.as_deref(), Some("mirror.example"));
        assert_eq!(config.max_tsv_age_seconds, Some(60));
        assert_eq!(config.db, None);

        fs::write(&path, "not json").unwrap();
        assert!(matches!(FileConfig::load_from(&path), Err(Error::Config(_))));
    }
}
