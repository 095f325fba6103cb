//! Collection change coalescer for gallerist.
//!
//! Collection files list image paths. When images are moved, renamed or
//! deleted, or added to and removed from collections that are not open, the
//! affected collection files have to be rewritten. Doing that per change is
//! wasteful: a batch rename touches the same file hundreds of times.
//!
//! This crate accumulates change notifications, folds them into one minimal
//! delta per collection file and rewrites only the files whose listing
//! actually changes, once the changes have stopped arriving for a while.
//!
//! # Example
//!
//! ```rust,no_run
//! use gallerist_coalesce::Coalescer;
//! use gallerist_core::{CoalescerConfig, FsStore};
//!
//! let config = CoalescerConfig::new("/home/user/.gallerist/collections");
//! let store = FsStore::from_config(&config);
//! let mut coalescer = Coalescer::new(config, store);
//!
//! coalescer.notify_moved("/photos/a.jpg", "/photos/2024/a.jpg");
//! coalescer.notify_added("/photos/b.jpg", "holiday");
//!
//! // Write everything out now instead of waiting for the debounce timer.
//! coalescer.flush();
//! ```
//!
//! # Running on an event loop
//!
//! [`CoalescerService`] drives a coalescer from a tokio task, honoring the
//! debounce timer and processing in bounded slices:
//!
//! ```rust,no_run
//! use gallerist_coalesce::{Coalescer, CoalescerService};
//! use gallerist_core::{CoalescerConfig, FsStore};
//!
//! # async fn demo() {
//! let config = CoalescerConfig::new("/home/user/.gallerist/collections");
//! let store = FsStore::from_config(&config);
//! let (service, handle) = CoalescerService::new(Coalescer::new(config, store));
//!
//! let producer = async move {
//!     handle.moved("/photos/a.jpg", "/photos/b.jpg").await.ok();
//!     handle.shutdown().await.ok();
//! };
//! tokio::join!(service.run(), producer);
//! # }
//! ```

mod action;
mod coalescer;
mod entry;
mod event;
mod queue;
mod registry;
mod replay;
mod scheduler;
mod service;

pub use action::{Action, ActionKind};
pub use coalescer::{Coalescer, CoalescerStats, OpenCollections, Step};
pub use entry::{Entry, MergeOutcome};
pub use event::ChangeEvent;
pub use queue::{ActionQueue, QueuedAction};
pub use registry::{EntryRegistry, ResyncReport};
pub use replay::replay;
pub use scheduler::{Scheduler, SchedulerState};
pub use service::{COMMAND_CHANNEL_SIZE, CoalescerHandle, CoalescerService, ServiceError};

// Re-export core types for convenience
pub use gallerist_core::{
    CoalescerConfig, CollectionError, CollectionFile, CollectionStore, FsStore, Geometry,
};
