//! Snapshot file cache: staleness checks and downloads.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use super::types::{TsvError, TsvResult};

/// Default host serving the dataset snapshots.
pub const DEFAULT_HOST: &str = "datasets.imdbws.com";

/// Default maximum age of a cached snapshot (14 days).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(86_400 * 14);

/// Remote location of a snapshot file.
///
/// A host given with an explicit `http://` or `https://` scheme is used as
/// a base URL as-is, which allows local mirrors.
#[must_use]
pub fn snapshot_url(host: &str, filename: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/{filename}")
    } else {
        format!("https://{host}/{filename}")
    }
}

/// Age of a file, from its modification time.
///
/// # Errors
///
/// Returns an error if the file metadata cannot be read.
pub fn file_age(path: &Path) -> TsvResult<Duration> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO))
}

/// Whether an existing file is older than `max_age`. Missing files are not stale.
///
/// # Errors
///
/// Returns an error if the file metadata cannot be read.
pub fn is_stale(path: &Path, max_age: Duration) -> TsvResult<bool> {
    if !path.exists() {
        return Ok(false);
    }
    Ok(file_age(path)? > max_age)
}

/// Delete the file if it is stale. Returns true if it was deleted.
///
/// # Errors
///
/// Returns an error if the metadata cannot be read or the file cannot be removed.
pub fn remove_if_stale(path: &Path, max_age: Duration) -> TsvResult<bool> {
    if !is_stale(path, max_age)? {
        return Ok(false);
    }
    warn!(
        file = %path.display(),
        max_age_seconds = max_age.as_secs(),
        "Cached file is too old, deleting it"
    );
    fs::remove_file(path)?;
    Ok(true)
}

/// Download `url` to `path`.
///
/// The body is streamed to `<path>.part` and renamed once complete, so an
/// interrupted download never looks like a finished file. Returns the
/// number of bytes written.
///
/// # Errors
///
/// Returns `TsvError::Download` for connection or HTTP status failures, or
/// an IO error if the file cannot be written.
pub fn download_file(url: &str, path: &Path) -> TsvResult<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let part = part_path(path);
    debug!(url, file = %part.display(), "Downloading");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = rt.block_on(stream_to_file(url, &part));
    match result {
        Ok(bytes) => {
            fs::rename(&part, path)?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(e)
        }
    }
}

async fn stream_to_file(url: &str, part: &Path) -> TsvResult<u64> {
    let download_error = |e: reqwest::Error| TsvError::Download {
        url: url.to_string(),
        message: e.to_string(),
    };

    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(download_error)?;

    let mut out = BufWriter::new(File::create(part)?);
    let mut bytes = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(download_error)? {
        out.write_all(&chunk)?;
        bytes += chunk.len() as u64;
    }
    out.flush()?;
    Ok(bytes)
}

/// Make sure a fresh copy of `filename` is in `dir`.
///
/// A cached copy older than `max_age` is deleted first; a missing file is
/// downloaded from `host`. Returns the local path and whether it was
/// downloaded.
///
/// # Errors
///
/// Returns an error if the cache cannot be inspected or the download fails.
pub fn ensure_file(
    dir: &Path,
    host: &str,
    filename: &str,
    max_age: Duration,
) -> TsvResult<(PathBuf, bool)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    remove_if_stale(&path, max_age)?;
    if path.exists() {
        debug!(file = %path.display(), "Using cached file");
        return Ok((path, false));
    }

    let url = snapshot_url(host, filename);
    info!(url = %url, "Downloading file");
    let bytes = download_file(&url, &path)?;
    info!(file = %path.display(), bytes, "Download complete");
    Ok((path, true))
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_url() {
        assert_eq!(
            snapshot_url("datasets.imdbws.com", "title.basics.tsv.gz"),
            "https://datasets.imdbws.com/title.basics.tsv.gz"
        );
        assert_eq!(
            snapshot_url("http://localhost:8000/", "title.basics.tsv.gz"),
            "http://localhost:8000/title.basics.tsv.gz"
        );
    }

    #[test]
    fn test_fresh_file_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("title.ratings.tsv.gz");
        fs::write(&path, b"cached").unwrap();

        assert!(!is_stale(&path, DEFAULT_MAX_AGE).unwrap());
        assert!(!remove_if_stale(&path, DEFAULT_MAX_AGE).unwrap());

        let (found, downloaded) =
            ensure_file(dir.path(), "unused.invalid", "title.ratings.tsv.gz", DEFAULT_MAX_AGE)
                .unwrap();
        assert_eq!(found, path);
        assert!(!downloaded);
        assert_eq!(fs::read(&path).unwrap(), b"cached");
    }

    #[test]
    fn test_missing_file_is_not_stale() {
        let dir = TempDir::new().unwrap();
        assert!(!is_stale(&dir.path().join("nope"), Duration::ZERO).unwrap());
    }

    #[test]
    fn test_failed_download_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("title.ratings.tsv.gz");
        let err = download_file("http://127.0.0.1:9/title.ratings.tsv.gz", &path).unwrap_err();
        assert!(matches!(err, TsvError::Download { .. }));
        assert!(!path.exists());
        assert!(!part_path(&path).exists());
    }
}
