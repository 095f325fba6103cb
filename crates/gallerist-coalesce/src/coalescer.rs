//! The collection change coalescer.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use gallerist_core::{CoalescerConfig, CollectionError, CollectionFile, CollectionStore};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::replay::replay;
use crate::{
    Action, ActionQueue, ChangeEvent, EntryRegistry, QueuedAction, Scheduler, SchedulerState,
};

/// Collections currently open for editing.
///
/// Changes to an open collection are applied to its in-memory copy instead of
/// being queued; the editor saves them with the rest of its edits.
pub trait OpenCollections {
    /// Add `file` to `collection` if it is open. Returns `true` when handled.
    fn add_if_open(&mut self, collection: &Path, file: &Path) -> bool;

    /// Remove every occurrence of `file` from `collection` if it is open.
    /// Returns `true` when handled.
    fn remove_if_open(&mut self, collection: &Path, file: &Path) -> bool;
}

/// Result of one processing slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work remains; schedule another slice.
    Continue,
    /// Everything is written out.
    Idle,
}

/// Counters describing what the coalescer has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoalescerStats {
    /// Draining passes started.
    pub passes: u64,
    /// Queued actions handed to entries.
    pub actions_distributed: u64,
    /// Actions dropped because another change already claimed the path.
    pub conflicts: u64,
    /// Collection files read for replay.
    pub collections_loaded: u64,
    /// Collection files rewritten.
    pub files_rewritten: u64,
}

/// Accumulates change notifications and rewrites affected collection files.
///
/// All state lives here and is touched from one thread only. Notifications
/// arm a debounce timer; once it expires the owner calls [`Coalescer::step`]
/// until it returns [`Step::Idle`], or calls [`Coalescer::flush`] to do all
/// of it at once.
pub struct Coalescer<S> {
    config: CoalescerConfig,
    store: S,
    queue: ActionQueue,
    registry: EntryRegistry,
    scheduler: Scheduler,
    open: Option<Box<dyn OpenCollections>>,
    stats: CoalescerStats,
}

impl<S> std::fmt::Debug for Coalescer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("collections_dir", &self.config.collections_dir)
            .field("queued", &self.queue.len())
            .field("entries", &self.registry.len())
            .field("state", &self.scheduler.state())
            .finish_non_exhaustive()
    }
}

impl<S: CollectionStore> Coalescer<S> {
    /// Create a coalescer over a collection store.
    pub fn new(config: CoalescerConfig, store: S) -> Self {
        let scheduler = Scheduler::new(config.debounce());
        Self {
            config,
            store,
            queue: ActionQueue::new(),
            registry: EntryRegistry::new(),
            scheduler,
            open: None,
            stats: CoalescerStats::default(),
        }
    }

    /// Route adds and removes for open collections through `open`.
    pub fn with_open_collections(mut self, open: impl OpenCollections + 'static) -> Self {
        self.open = Some(Box::new(open));
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &CoalescerConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The entry registry.
    pub fn registry(&self) -> &EntryRegistry {
        &self.registry
    }

    /// Scheduler state.
    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Counters so far.
    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            passes: self.scheduler.passes(),
            ..self.stats
        }
    }

    /// Number of actions not yet handed to entries.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Check if there is nothing queued and nothing left to write.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.registry.has_dirty()
    }

    /// A file was moved or renamed.
    pub fn notify_moved(&mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) {
        self.enqueue(QueuedAction::broadcast(Action::update(from, to)));
    }

    /// A file was added to a collection.
    pub fn notify_added(&mut self, file: impl Into<PathBuf>, collection: impl AsRef<Path>) {
        let file = file.into();
        let collection = self.config.collection_path(collection);

        if let Some(open) = self.open.as_mut() {
            if open.add_if_open(&collection, &file) {
                debug!(target: "collect", "added {} to open collection {}", file.display(), collection.display());
                return;
            }
        }
        self.enqueue(QueuedAction::targeted(Action::add(file), collection));
    }

    /// A file was removed from a collection.
    pub fn notify_removed(&mut self, file: impl Into<PathBuf>, collection: impl AsRef<Path>) {
        let file = file.into();
        let collection = self.config.collection_path(collection);

        if let Some(open) = self.open.as_mut() {
            if open.remove_if_open(&collection, &file) {
                debug!(target: "collect", "removed {} from open collection {}", file.display(), collection.display());
                return;
            }
        }
        self.enqueue(QueuedAction::targeted(Action::remove(file), collection));
    }

    /// Dispatch a change event to the matching `notify_*` call.
    pub fn notify(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Moved { from, to } => self.notify_moved(from, to),
            ChangeEvent::Added { file, collection } => self.notify_added(file, collection),
            ChangeEvent::Removed { file, collection } => self.notify_removed(file, collection),
        }
    }

    fn enqueue(&mut self, queued: QueuedAction) {
        self.queue.push(queued);
        self.scheduler.arm(Instant::now());
    }

    /// Deadline of the armed debounce timer.
    pub fn deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// Start draining if the debounce timer has expired at `now`.
    pub fn poll_timer(&mut self, now: Instant) -> bool {
        self.scheduler.poll(now)
    }

    /// Check if a draining pass is running.
    pub fn is_draining(&self) -> bool {
        self.scheduler.is_draining()
    }

    /// Run one bounded processing slice.
    ///
    /// Queued actions are distributed first, one batch per slice, after
    /// resyncing the registry with the collections on disk. Once the queue is
    /// empty, each slice replays one dirty entry against its file.
    pub fn step(&mut self) -> Step {
        if !self.queue.is_empty() {
            self.resync();
            self.distribute();
            return Step::Continue;
        }

        if let Some(path) = self.registry.next_dirty() {
            self.process_entry(&path);
            return Step::Continue;
        }

        debug!(target: "collect", "collection manager is up to date");
        self.scheduler.finish();
        Step::Idle
    }

    /// Cancel the timer and process everything pending right now.
    pub fn flush(&mut self) {
        self.scheduler.cancel();
        if self.is_idle() && !self.scheduler.is_draining() {
            return;
        }

        debug!(target: "collect", "collection manager flushing");
        self.scheduler.begin_drain();
        while self.step() == Step::Continue {}
    }

    /// Load a collection after writing out every pending change.
    pub fn load_collection(
        &mut self,
        collection: impl AsRef<Path>,
    ) -> Result<CollectionFile, CollectionError> {
        self.flush();
        let path = self.config.collection_path(collection);
        self.store.load(&path)
    }

    /// Save a collection and start tracking it immediately.
    pub fn save_collection(
        &mut self,
        collection: impl AsRef<Path>,
        contents: &CollectionFile,
    ) -> Result<(), CollectionError> {
        let path = self.config.collection_path(collection);
        self.store.save(&path, contents)?;
        self.registry.get_or_create(&path);
        Ok(())
    }

    fn resync(&mut self) {
        match self.store.list_collections() {
            Ok(present) => {
                self.registry.resync(&present);
            }
            Err(e) => {
                warn!(target: "collect", "failed to list collections: {e}");
            }
        }
    }

    fn distribute(&mut self) {
        debug!(target: "collect", queued = self.queue.len(), "collection manager processing actions");

        let batch: Vec<QueuedAction> = self
            .queue
            .drain_batch(self.config.actions_per_slice)
            .collect();

        for queued in batch {
            let (action, target) = queued.into_parts();
            self.stats.actions_distributed += 1;

            let Some(collection) = target else {
                for entry in self.registry.iter_mut() {
                    if entry.add_action(Rc::clone(&action)).is_conflict() {
                        self.stats.conflicts += 1;
                    }
                }
                continue;
            };

            match self.registry.get_mut(&collection) {
                Some(entry) => {
                    if entry.add_action(action).is_conflict() {
                        self.stats.conflicts += 1;
                    }
                }
                None => {
                    let file = action.source().or(action.dest()).unwrap_or(Path::new(""));
                    warn!(
                        target: "collect",
                        "collection manager failed to {} {} for collection {}",
                        action.kind(),
                        file.display(),
                        collection.display()
                    );
                }
            }
        }
    }

    fn process_entry(&mut self, path: &Path) {
        let Some(entry) = self.registry.get_mut(path) else {
            return;
        };

        match self.store.load(path) {
            Ok(mut collection) => {
                self.stats.collections_loaded += 1;
                if replay(entry, &mut collection) {
                    match self.store.save(path, &collection) {
                        Ok(()) => {
                            self.stats.files_rewritten += 1;
                            info!(target: "collect", "updated collection {}", path.display());
                        }
                        Err(e) => {
                            warn!(target: "collect", "failed to save collection {}: {e}", path.display());
                        }
                    }
                }
            }
            Err(e) => {
                warn!(target: "collect", "failed to load collection {}: {e}", path.display());
            }
        }

        entry.reset();
    }
}
