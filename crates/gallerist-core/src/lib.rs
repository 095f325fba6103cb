//! Core types for gallerist.
//!
//! This crate provides the pieces shared by the coalescer and the CLI:
//! configuration, error types, the collection file codec and the
//! [`CollectionStore`] abstraction over the collections directory.

mod collection;
mod config;
mod error;
mod store;

pub use collection::{COLLECTION_MARKER, CollectionFile, Geometry};
pub use config::{CoalescerConfig, CoalescerConfigBuilder};
pub use error::CollectionError;
pub use store::{CollectionStore, FsStore};
