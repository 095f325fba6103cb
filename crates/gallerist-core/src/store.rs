//! Access to the collections directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{CoalescerConfig, CollectionError, CollectionFile};

/// Storage backend for collection files.
///
/// The coalescer only ever lists, loads and saves whole collection files, so
/// this is the full surface it needs from the filesystem.
pub trait CollectionStore {
    /// List the collection files currently present.
    fn list_collections(&self) -> Result<Vec<PathBuf>, CollectionError>;

    /// Load and parse a collection file.
    fn load(&self, path: &Path) -> Result<CollectionFile, CollectionError>;

    /// Replace a collection file with new contents.
    fn save(&self, path: &Path, collection: &CollectionFile) -> Result<(), CollectionError>;
}

impl<S: CollectionStore + ?Sized> CollectionStore for Box<S> {
    fn list_collections(&self) -> Result<Vec<PathBuf>, CollectionError> {
        (**self).list_collections()
    }

    fn load(&self, path: &Path) -> Result<CollectionFile, CollectionError> {
        (**self).load(path)
    }

    fn save(&self, path: &Path, collection: &CollectionFile) -> Result<(), CollectionError> {
        (**self).save(path, collection)
    }
}

/// Collection store backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
    extension: String,
}

impl FsStore {
    /// Create a store for a directory, matching files by extension.
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Create a store from a coalescer config.
    pub fn from_config(config: &CoalescerConfig) -> Self {
        Self::new(&config.collections_dir, &config.extension)
    }

    /// The directory this store lists.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

impl CollectionStore for FsStore {
    fn list_collections(&self) -> Result<Vec<PathBuf>, CollectionError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "collect", "collections directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(CollectionError::io(&self.dir, e)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CollectionError::io(&self.dir, e))?;
            let path = entry.path();
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && self.matches_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn load(&self, path: &Path) -> Result<CollectionFile, CollectionError> {
        let data = fs::read(path).map_err(|e| CollectionError::io(path, e))?;
        CollectionFile::parse(&data, path)
    }

    fn save(&self, path: &Path, collection: &CollectionFile) -> Result<(), CollectionError> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        // The temp file is removed on drop if anything below fails.
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| CollectionError::io(parent, e))?;
        let written = tmp
            .write_all(&collection.to_bytes())
            .and_then(|()| tmp.as_file_mut().sync_all());
        written.map_err(|e| CollectionError::io(tmp.path(), e))?;

        if let Ok(metadata) = fs::metadata(path) {
            let _ = fs::set_permissions(tmp.path(), metadata.permissions());
        }

        tmp.persist(path)
            .map_err(|e| CollectionError::io(path, e.error))?;
        debug!(target: "collect", "saved collection {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_collections_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.gqv"), "").unwrap();
        fs::write(dir.path().join("a.GQV"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub.gqv")).unwrap();

        let store = FsStore::new(dir.path(), "gqv");
        let listed = store.list_collections().unwrap();
        assert_eq!(
            listed,
            vec![dir.path().join("a.GQV"), dir.path().join("b.gqv")]
        );
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("missing"), "gqv");
        assert!(store.list_collections().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trip.gqv");
        let store = FsStore::new(dir.path(), "gqv");

        let collection = CollectionFile::from_paths(["/photos/1.jpg", "/photos/2.jpg"]);
        store.save(&path, &collection).unwrap();

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.paths, collection.paths);

        // Only the collection itself is left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path(), "gqv");
        let err = store.load(&dir.path().join("nope.gqv")).unwrap_err();
        assert!(err.is_not_found());
    }
}
