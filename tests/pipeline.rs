//! End-to-end import, export and search over synthetic snapshot files.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use imdb::pipeline::{ExportOptions, ImportOptions, run_export, run_import};
use imdb::search::title_search;
use imdb::storage::SqliteStorage;
use imdb::tsv::EntityKind;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::TempDir;

const FILES: [(&str, &str); 6] = [
    (
        "title.basics.tsv.gz",
        "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres\n\
         tt0000001\tshort\tCarmencita\tCarmencita\t0\t1894\t\\N\t1\tDocumentary,Short\n\
         tt0000012\tmovie\tThe Arrival of a Train\tL'arrivée d'un train à La Ciotat\t0\t1896\t\\N\t1\tDocumentary,Short\n\
         tt0041038\ttvSeries\tThe Lone Ranger\tThe Lone Ranger\t0\t1949\t1957\t30\tAdventure,Western\n\
         tt0041951\ttvEpisode\tEnter the Lone Ranger\tEnter the Lone Ranger\t0\t1949\t\\N\t30\tAdventure,Western\n",
    ),
    (
        "name.basics.tsv.gz",
        "nconst\tprimaryName\tbirthYear\tdeathYear\tprimaryProfession\tknownForTitles\n\
         nm0000001\tFred Astaire\t1899\t1987\tsoundtrack,actor,miscellaneous\ttt0050419,tt0053137\n\
         nm0005690\tWilliam K.L. Dickson\t1860\t1935\tcinematographer,director,producer\ttt0000001,tt1428455\n",
    ),
    (
        "title.akas.tsv.gz",
        "titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle\n\
         tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1\n\
         tt0000001\t2\tCarmencita\tUS\t\\N\timdbDisplay\t\\N\t0\n\
         tt0000012\t1\tL'arrivée d'un train à La Ciotat\tFR\t\\N\timdbDisplay\t\\N\t0\n\
         tt0000012\t2\tThe Arrival of a Train\tUS\t\\N\timdbDisplay\t\\N\t0\n",
    ),
    (
        "title.principals.tsv.gz",
        "tconst\tordering\tnconst\tcategory\tjob\tcharacters\n\
         tt0000001\t1\tnm0005690\tdirector\t\\N\t\\N\n\
         tt0000001\t2\tnm0000001\tself\t\\N\t[\"Self\"]\n",
    ),
    (
        "title.episode.tsv.gz",
        "tconst\tparentTconst\tseasonNumber\tepisodeNumber\n\
         tt0041951\ttt0041038\t1\t1\n",
    ),
    (
        "title.ratings.tsv.gz",
        "tconst\taverageRating\tnumVotes\n\
         tt0000001\t5.7\t1900\n\
         tt0000012\t7.0\t13000\n",
    ),
];

fn write_gz(path: &Path, content: &str) {
    let mut out = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    out.write_all(content.as_bytes()).unwrap();
    out.finish().unwrap();
}

fn read_gz(path: &Path) -> String {
    let mut content = String::new();
    GzDecoder::new(File::open(path).unwrap())
        .read_to_string(&mut content)
        .unwrap();
    content
}

fn seed(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in FILES {
        write_gz(&dir.join(name), content);
    }
}

fn import_options(dir: &Path) -> ImportOptions {
    let mut opts = ImportOptions::new(dir.to_path_buf());
    // every file is cached, so nothing may be fetched
    opts.host = "http://127.0.0.1:9".into();
    opts
}

#[test]
fn test_import_export_round_trip() {
    let temp = TempDir::new().unwrap();
    let download = temp.path().join("download");
    seed(&download);
    let mut storage = SqliteStorage::open(&temp.path().join("imdb.db")).unwrap();

    let (stats, reindex) = run_import(&mut storage, &import_options(&download)).unwrap();
    assert_eq!(stats.entities.len(), 6);
    assert!(stats.downloaded.is_empty());
    assert_eq!(stats.total_records(), 15);
    // tt0000012 is the only movie, with two alternate titles
    assert_eq!(reindex.unwrap().indexed, 2);

    let export = temp.path().join("export");
    let exported = run_export(&storage, &ExportOptions::new(export.clone())).unwrap();
    assert_eq!(exported.total(), 15);

    for (name, content) in FILES {
        assert_eq!(read_gz(&export.join(name)), content, "{name} differs");
    }
}

#[test]
fn test_import_is_idempotent() {
    let temp = TempDir::new().unwrap();
    seed(temp.path());
    let mut storage = SqliteStorage::open_memory().unwrap();
    let opts = import_options(temp.path());

    run_import(&mut storage, &opts).unwrap();
    let first = storage.table_counts().unwrap();
    let title = storage.get_title("tt0041038").unwrap();

    let (stats, _) = run_import(&mut storage, &opts).unwrap();
    assert_eq!(stats.total_dimensions_created(), 0);
    assert_eq!(storage.table_counts().unwrap(), first);
    assert_eq!(storage.get_title("tt0041038").unwrap(), title);
}

#[test]
fn test_search_after_import() {
    let temp = TempDir::new().unwrap();
    seed(temp.path());
    let mut storage = SqliteStorage::open_memory().unwrap();
    let mut opts = import_options(temp.path());
    opts.reindex_types = vec!["movie".into(), "short".into()];
    run_import(&mut storage, &opts).unwrap();

    assert_eq!(
        title_search(&storage, "carmencita", None, None).unwrap(),
        ["tt0000001"]
    );
    assert_eq!(
        title_search(&storage, "Ciotat", None, Some(5)).unwrap(),
        ["tt0000012"]
    );
    assert_eq!(
        title_search(&storage, "arrival of a train", Some(1896), None).unwrap(),
        ["tt0000012"]
    );
    assert!(title_search(&storage, "arrival of a train", Some(1900), None)
        .unwrap()
        .is_empty());
    assert!(title_search(&storage, "lone ranger", None, None).unwrap().is_empty());
}

#[test]
fn test_skipped_dimension_becomes_placeholder() {
    let temp = TempDir::new().unwrap();
    seed(temp.path());
    let mut storage = SqliteStorage::open_memory().unwrap();
    let mut opts = import_options(temp.path());
    opts.reindex = false;
    opts.skip = [EntityKind::Title, EntityKind::Person].into_iter().collect();
    run_import(&mut storage, &opts).unwrap();

    let show = storage.get_title("tt0041038").unwrap().unwrap();
    assert!(show.is_placeholder());
    assert_eq!(storage.list_episodes("tt0041038").unwrap().len(), 1);

    let export = temp.path().join("export");
    let stats = run_export(&storage, &ExportOptions::new(export.clone())).unwrap();
    let titles = stats
        .entities
        .iter()
        .find(|e| e.entity == EntityKind::Title)
        .unwrap();
    assert_eq!(titles.exported, 0);
    assert_eq!(titles.skipped, 4);
    assert_eq!(
        read_gz(&export.join("title.basics.tsv.gz")).lines().count(),
        1
    );
}
