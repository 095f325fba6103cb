//! Table of entries, one per collection file on disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::Entry;

/// What a [`EntryRegistry::resync`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    /// Entries created for newly seen collection files.
    pub created: usize,
    /// Entries dropped because their file disappeared.
    pub removed: usize,
    /// Removed entries that still had unreplayed changes.
    pub discarded_pending: usize,
}

/// Entries keyed by collection file path, in discovery order.
#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: IndexMap<PathBuf, Entry>,
}

impl EntryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the registry in line with the collection files present.
    ///
    /// Entries whose file vanished are dropped together with any changes they
    /// still held; those changes are lost, not retried.
    pub fn resync(&mut self, present: &[PathBuf]) -> ResyncReport {
        let mut report = ResyncReport::default();
        let present_set: HashSet<&Path> = present.iter().map(PathBuf::as_path).collect();

        self.entries.retain(|path, entry| {
            if present_set.contains(path.as_path()) {
                return true;
            }
            if entry.has_pending() {
                warn!(
                    target: "collect",
                    "collection {} disappeared, dropping its pending changes",
                    path.display()
                );
                report.discarded_pending += 1;
            }
            report.removed += 1;
            false
        });

        for path in present {
            if !self.entries.contains_key(path) {
                self.entries.insert(path.clone(), Entry::new(path.clone()));
                report.created += 1;
            }
        }

        if report.created > 0 || report.removed > 0 {
            debug!(
                target: "collect",
                created = report.created,
                removed = report.removed,
                "collection registry resynced"
            );
        }
        report
    }

    /// Entry for a collection file, if tracked.
    pub fn get(&self, path: &Path) -> Option<&Entry> {
        self.entries.get(path)
    }

    /// Mutable entry for a collection file, if tracked.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Entry> {
        self.entries.get_mut(path)
    }

    /// Entry for a collection file, created on demand.
    pub fn get_or_create(&mut self, path: &Path) -> &mut Entry {
        self.entries
            .entry(path.to_path_buf())
            .or_insert_with(|| Entry::new(path))
    }

    /// Path of the first entry with merged changes.
    pub fn next_dirty(&self) -> Option<PathBuf> {
        self.entries
            .values()
            .find(|entry| entry.is_dirty())
            .map(|entry| entry.path().to_path_buf())
    }

    /// Check if any entry has merged changes.
    pub fn has_dirty(&self) -> bool {
        self.entries.values().any(Entry::is_dirty)
    }

    /// Iterate over all entries mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.values_mut()
    }

    /// Number of tracked collection files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no collection file is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::Action;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_resync_diff() {
        let mut registry = EntryRegistry::new();
        let report = registry.resync(&paths(&["/c/a.gqv", "/c/b.gqv"]));
        assert_eq!(report.created, 2);
        assert_eq!(registry.len(), 2);

        registry
            .get_mut(Path::new("/c/a.gqv"))
            .unwrap()
            .add_action(Rc::new(Action::update("/x", "/y")));

        let report = registry.resync(&paths(&["/c/a.gqv", "/c/c.gqv"]));
        assert_eq!(
            report,
            ResyncReport {
                created: 1,
                removed: 1,
                discarded_pending: 0
            }
        );
        // Surviving entries keep their state.
        assert!(registry.get(Path::new("/c/a.gqv")).unwrap().is_dirty());
        assert!(registry.get(Path::new("/c/b.gqv")).is_none());
    }

    #[test]
    fn test_resync_discards_pending_of_vanished_file() {
        let mut registry = EntryRegistry::new();
        registry.resync(&paths(&["/c/a.gqv"]));
        let action = Rc::new(Action::add("/f"));
        registry
            .get_mut(Path::new("/c/a.gqv"))
            .unwrap()
            .add_action(Rc::clone(&action));

        let report = registry.resync(&[]);
        assert_eq!(report.discarded_pending, 1);
        assert!(registry.is_empty());
        assert_eq!(Rc::strong_count(&action), 1);
    }

    #[test]
    fn test_next_dirty_in_discovery_order() {
        let mut registry = EntryRegistry::new();
        registry.resync(&paths(&["/c/a.gqv", "/c/b.gqv"]));
        assert!(registry.next_dirty().is_none());

        registry
            .get_or_create(Path::new("/c/b.gqv"))
            .add_action(Rc::new(Action::remove("/f")));
        registry
            .get_or_create(Path::new("/c/a.gqv"))
            .add_action(Rc::new(Action::remove("/f")));

        assert_eq!(registry.next_dirty(), Some(PathBuf::from("/c/a.gqv")));
        registry.get_mut(Path::new("/c/a.gqv")).unwrap().reset();
        assert_eq!(registry.next_dirty(), Some(PathBuf::from("/c/b.gqv")));
    }
}
