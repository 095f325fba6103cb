//! Per-collection accumulator of pending changes.
//!
//! An [`Entry`] folds every action that touches one collection file into the
//! smallest delta that still describes it. Chains of moves collapse into one
//! action running from the earliest known source to the latest destination,
//! so replaying the entry against the file only needs a single lookup per
//! listed path.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::warn;

use crate::Action;

/// What [`Entry::add_action`] did with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Pure add without a destination; nothing to track.
    Ignored,
    /// Queued as a pending add.
    Added,
    /// Folded into the action already tracking its source.
    Chained,
    /// Tracked as a new source mapping.
    Tracked,
    /// Dropped: another add already targets the same destination.
    DuplicateDest,
    /// Dropped: another action already starts from the same source.
    DuplicateSource,
}

impl MergeOutcome {
    /// Whether the action was dropped because of a conflict.
    pub fn is_conflict(self) -> bool {
        matches!(self, Self::DuplicateDest | Self::DuplicateSource)
    }
}

/// Pending changes for one collection file.
#[derive(Debug)]
pub struct Entry {
    path: PathBuf,
    pending_adds: VecDeque<Rc<Action>>,
    by_source: HashMap<PathBuf, Rc<Action>>,
    by_dest: HashMap<PathBuf, Rc<Action>>,
    dirty: bool,
}

impl Entry {
    /// Create an empty entry for a collection file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending_adds: VecDeque::new(),
            by_source: HashMap::new(),
            by_dest: HashMap::new(),
            dirty: false,
        }
    }

    /// Collection file this entry tracks.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether actions were merged since the last reset.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether any merged change is still waiting to be replayed.
    pub fn has_pending(&self) -> bool {
        !self.pending_adds.is_empty() || !self.by_source.is_empty()
    }

    /// Action relocating or dropping `source`, if any.
    pub fn source_action(&self, source: &Path) -> Option<&Rc<Action>> {
        self.by_source.get(source)
    }

    /// Action currently targeting `dest`, if any.
    pub fn dest_action(&self, dest: &Path) -> Option<&Rc<Action>> {
        self.by_dest.get(dest)
    }

    /// Pending pure adds, in arrival order.
    pub fn pending_adds(&self) -> impl Iterator<Item = &Rc<Action>> {
        self.pending_adds.iter()
    }

    /// Merge an action into the entry.
    pub fn add_action(&mut self, action: Rc<Action>) -> MergeOutcome {
        self.dirty = true;

        let Some(source) = action.source() else {
            return self.add_pending(action);
        };

        // The source is a destination we already track: fold the new step
        // into that chain.
        if let Some(orig) = self.by_dest.remove(source) {
            let chained = Rc::new(Action::new(
                orig.source().map(Path::to_path_buf),
                action.dest().map(Path::to_path_buf),
                action.kind(),
            ));

            match orig.source() {
                Some(orig_source) => {
                    self.by_source
                        .insert(orig_source.to_path_buf(), Rc::clone(&chained));
                }
                None => {
                    if let Some(slot) = self
                        .pending_adds
                        .iter_mut()
                        .find(|pending| Rc::ptr_eq(pending, &orig))
                    {
                        *slot = Rc::clone(&chained);
                    }
                }
            }

            if let Some(dest) = chained.dest() {
                self.by_dest.insert(dest.to_path_buf(), Rc::clone(&chained));
            }
            return MergeOutcome::Chained;
        }

        if self.by_source.contains_key(source) {
            warn!(
                target: "collect",
                "failed to add another action for source {} in collection {}",
                source.display(),
                self.path.display()
            );
            return MergeOutcome::DuplicateSource;
        }

        let source = source.to_path_buf();
        if let Some(dest) = action.dest() {
            self.by_dest.insert(dest.to_path_buf(), Rc::clone(&action));
        }
        self.by_source.insert(source, action);
        MergeOutcome::Tracked
    }

    fn add_pending(&mut self, action: Rc<Action>) -> MergeOutcome {
        let Some(dest) = action.dest() else {
            return MergeOutcome::Ignored;
        };

        if self.by_dest.contains_key(dest) {
            warn!(
                target: "collect",
                "failed to add another action for target {} in collection {}",
                dest.display(),
                self.path.display()
            );
            return MergeOutcome::DuplicateDest;
        }

        self.by_dest.insert(dest.to_path_buf(), Rc::clone(&action));
        self.pending_adds.push_back(action);
        MergeOutcome::Added
    }

    /// Apply the entry to one line of the collection being read.
    ///
    /// With `Some(path)`, returns where that listed path ends up and whether an
    /// action matched; a `None` path means the line is dropped. With `None`,
    /// pops the next pending add and returns its path, or `(None, false)` once
    /// no adds are left.
    pub fn replay_step(&mut self, current: Option<&Path>) -> (Option<PathBuf>, bool) {
        let Some(path) = current else {
            while let Some(action) = self.pending_adds.pop_front() {
                // An add removed again before processing has no destination.
                let Some(dest) = action.dest() else {
                    continue;
                };
                if self
                    .by_dest
                    .get(dest)
                    .is_some_and(|tracked| Rc::ptr_eq(tracked, &action))
                {
                    self.by_dest.remove(dest);
                }
                return (Some(dest.to_path_buf()), true);
            }
            return (None, false);
        };

        match self.by_source.get(path) {
            Some(action) => (action.dest().map(Path::to_path_buf), true),
            None => (Some(path.to_path_buf()), false),
        }
    }

    /// Drop all merged state and clear the dirty flag.
    pub fn reset(&mut self) {
        self.pending_adds.clear();
        self.by_source.clear();
        self.by_dest.clear();
        self.dirty = false;
    }
}
