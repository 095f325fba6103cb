use std::fs;
use std::path::{Path, PathBuf};

use gallerist_core::{
    COLLECTION_MARKER, CoalescerConfig, CollectionError, CollectionFile, CollectionStore, FsStore,
    Geometry,
};

#[test]
fn test_store_from_config_lists_collections() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoalescerConfig::builder()
        .collections_dir(dir.path())
        .extension("col")
        .build()
        .unwrap();
    let store = FsStore::from_config(&config);

    fs::write(dir.path().join("a.col"), "").unwrap();
    fs::write(dir.path().join("b.gqv"), "").unwrap();

    assert_eq!(store.dir(), dir.path());
    assert_eq!(store.list_collections().unwrap(), vec![dir.path().join("a.col")]);
    assert_eq!(config.collection_path("a"), dir.path().join("a.col"));
}

#[test]
fn test_unofficial_file_drops_missing_paths() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("present.jpg");
    fs::write(&present, b"jpeg").unwrap();

    let text = format!(
        "\"{}\"\n\"{}\"\n",
        present.display(),
        dir.path().join("absent.jpg").display()
    );
    let path = dir.path().join("old.gqv");
    fs::write(&path, text).unwrap();

    let store = FsStore::new(dir.path(), "gqv");
    let collection = store.load(&path).unwrap();
    assert!(!collection.official);
    assert_eq!(collection.paths, vec![present]);
}

#[test]
fn test_saved_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trip.gqv");
    let store = FsStore::new(dir.path(), "gqv");

    let mut collection = CollectionFile::from_paths(["/p/a.jpg"]);
    collection.geometry = Some(Geometry {
        x: 1,
        y: 2,
        w: 3,
        h: 4,
    });
    store.save(&path, &collection).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], format!("{COLLECTION_MARKER} collection"));
    assert!(lines[1].starts_with("#created with gallerist version"));
    assert_eq!(lines[2], "#geometry: 1 2 3 4");
    assert_eq!(lines[3], "\"/p/a.jpg\"");
    assert_eq!(lines[4], "#end");
}

#[cfg(unix)]
#[test]
fn test_save_keeps_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trip.gqv");
    fs::write(&path, "#Gallerist collection\n#end\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

    let store = FsStore::new(dir.path(), "gqv");
    store
        .save(&path, &CollectionFile::from_paths(["/p/a.jpg"]))
        .unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o640);
}

#[test]
fn test_save_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path(), "gqv");
    let path: PathBuf = dir.path().join("nope").join("trip.gqv");

    let err = store.save(&path, &CollectionFile::new()).unwrap_err();
    assert!(matches!(err, CollectionError::NotFound { .. }));
    assert!(!Path::new(&path).exists());
}
