//! Pending change records.

use std::path::{Path, PathBuf};

use strum::{AsRefStr, Display};

/// What a pending change does to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    /// A file moved from `source` to `dest`.
    Update,
    /// A file is added to a collection.
    Add,
    /// A file is removed from a collection.
    Remove,
}

/// One pending change.
///
/// Actions are never modified once built; merging creates a new action and
/// drops the old one. They are shared between an entry's indices as
/// `Rc<Action>`, so the strong count is the number of places tracking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    source: Option<PathBuf>,
    dest: Option<PathBuf>,
    kind: ActionKind,
}

impl Action {
    /// Create an action from its parts.
    pub fn new(source: Option<PathBuf>, dest: Option<PathBuf>, kind: ActionKind) -> Self {
        Self { source, dest, kind }
    }

    /// A file moved from `source` to `dest`.
    pub fn update(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self::new(Some(source.into()), Some(dest.into()), ActionKind::Update)
    }

    /// A file is added to a collection.
    pub fn add(file: impl Into<PathBuf>) -> Self {
        Self::new(None, Some(file.into()), ActionKind::Add)
    }

    /// A file is removed from a collection.
    pub fn remove(file: impl Into<PathBuf>) -> Self {
        Self::new(Some(file.into()), None, ActionKind::Remove)
    }

    /// Path the change starts from; `None` for pure adds.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Path the change ends at; `None` when the file is dropped.
    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }

    /// Kind of the most recent change folded into this action.
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Whether this action leaves its source where it was.
    pub fn is_noop(&self) -> bool {
        self.source.is_some() && self.source == self.dest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_hold_kind_invariants() {
        let add = Action::add("/a.jpg");
        assert_eq!(add.kind(), ActionKind::Add);
        assert!(add.source().is_none());
        assert_eq!(add.dest(), Some(Path::new("/a.jpg")));

        let remove = Action::remove("/a.jpg");
        assert_eq!(remove.kind(), ActionKind::Remove);
        assert!(remove.dest().is_none());

        let update = Action::update("/a.jpg", "/b.jpg");
        assert!(update.source().is_some() && update.dest().is_some());
        assert!(!update.is_noop());
        assert!(Action::update("/a.jpg", "/a.jpg").is_noop());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ActionKind::Update.to_string(), "update");
        assert_eq!(ActionKind::Remove.as_ref(), "remove");
    }
}
