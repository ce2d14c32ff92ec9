//! Binary-level tests. Stdout is not a terminal here, so every command
//! prints JSON.

use assert_cmd::Command;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn imdb(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("imdb").unwrap();
    cmd.env("HOME", home)
        .env_remove("IMDB_TSV_DB")
        .env_remove("IMDB_TSV_DOWNLOAD_DIR")
        .env_remove("IMDB_TSV_EXPORT_DIR")
        .env_remove("IMDB_TSV_HOST")
        .env_remove("IMDB_TSV_MAX_AGE")
        .env_remove("RUST_LOG");
    cmd
}

fn json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

fn write_gz(path: &Path, content: &str) {
    let mut out = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    out.write_all(content.as_bytes()).unwrap();
    out.finish().unwrap();
}

fn seed(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    write_gz(
        &dir.join("title.basics.tsv.gz"),
        "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres\n\
         tt0000001\tshort\tCarmencita\tCarmencita\t0\t1894\t\\N\t1\tDocumentary,Short\n\
         tt0000012\tmovie\tThe Arrival of a Train\tThe Arrival of a Train\t0\t1896\t\\N\t1\tDocumentary,Short\n",
    );
    write_gz(
        &dir.join("title.akas.tsv.gz"),
        "titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle\n\
         tt0000012\t1\tThe Arrival of a Train\tUS\t\\N\timdbDisplay\t\\N\t0\n",
    );
    write_gz(
        &dir.join("title.ratings.tsv.gz"),
        "tconst\taverageRating\tnumVotes\ntt0000001\t5.7\t1900\n",
    );
}

/// Import the seeded files into `<home>/imdb.db`.
fn import(home: &Path) {
    let download = home.join("download");
    seed(&download);
    let output = imdb(home)
        .args(["-q", "--db"])
        .arg(home.join("imdb.db"))
        .arg("import")
        .arg("--download-dir")
        .arg(&download)
        .args([
            "--download-host",
            "http://127.0.0.1:9",
            "--no-samples",
            "--skip-name-basics",
            "--skip-title-principals",
            "--skip-title-episodes",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let result = json(&output);
    assert_eq!(result["import"]["entities"].as_array().unwrap().len(), 3);
    assert_eq!(result["reindex"]["indexed"], 1);
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    let output = imdb(home.path()).arg("version").assert().success().get_output().stdout.clone();
    let version = json(&output);
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_search_without_database() {
    let home = TempDir::new().unwrap();
    let assert = imdb(home.path())
        .args(["-q", "--db"])
        .arg(home.path().join("missing.db"))
        .args(["search", "carmencita"])
        .assert()
        .code(2);
    let error = json(&assert.get_output().stderr);
    assert_eq!(error["error"]["code"], "NOT_INITIALIZED");
}

#[test]
fn test_import_then_query() {
    let home = TempDir::new().unwrap();
    import(home.path());
    let db = home.path().join("imdb.db");

    let output = imdb(home.path())
        .arg("--db")
        .arg(&db)
        .args(["search", "arrival", "--year", "1896"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let found = json(&output);
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["title_id"], "tt0000012");

    let output = imdb(home.path())
        .arg("--db")
        .arg(&db)
        .args(["titles", "show", "tt0000001"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let shown = json(&output);
    assert_eq!(shown["title"]["primary_title"], "Carmencita");
    assert_eq!(shown["rating"]["votes"], 1900);

    let output = imdb(home.path())
        .arg("--db")
        .arg(&db)
        .args(["titles", "list", "--type", "movie"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(json(&output)["count"], 1);

    imdb(home.path())
        .arg("--db")
        .arg(&db)
        .args(["titles", "show", "tt9999999"])
        .assert()
        .code(3);
}

#[test]
fn test_status_and_export() {
    let home = TempDir::new().unwrap();
    import(home.path());
    let db = home.path().join("imdb.db");

    let output = imdb(home.path())
        .arg("--db")
        .arg(&db)
        .arg("status")
        .arg("--download-dir")
        .arg(home.path().join("download"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let status = json(&output);
    let files = status["files"].as_array().unwrap();
    assert_eq!(files.len(), 6);
    assert_eq!(files.iter().filter(|f| f["present"] == true).count(), 3);

    let export = home.path().join("export");
    let output = imdb(home.path())
        .args(["-q", "--db"])
        .arg(&db)
        .arg("export")
        .arg("--export-dir")
        .arg(&export)
        .arg("--skip-name-basics")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(json(&output)["entities"].as_array().unwrap().len(), 5);
    assert!(export.join("title.basics.tsv.gz").exists());
    assert!(!export.join("name.basics.tsv.gz").exists());
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    let output = imdb(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("imdb"));
}
