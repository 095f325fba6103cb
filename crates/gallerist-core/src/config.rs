//! Coalescer configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::CollectionError;

/// Default quiet period before pending changes are written out.
pub const DEFAULT_DEBOUNCE_MS: u64 = 10_000;

/// Default number of queued actions distributed per processing slice.
pub const DEFAULT_ACTIONS_PER_SLICE: usize = 1000;

/// Configuration for the collection change coalescer.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct CoalescerConfig {
    /// Directory holding the collection files.
    pub collections_dir: PathBuf,

    /// Quiet period (milliseconds) after the last change before processing starts.
    #[builder(default = "DEFAULT_DEBOUNCE_MS")]
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum queued actions handed to entries per slice.
    #[builder(default = "DEFAULT_ACTIONS_PER_SLICE")]
    #[serde(default = "default_actions_per_slice")]
    pub actions_per_slice: usize,

    /// File extension identifying collection files.
    #[builder(default = "default_extension()")]
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_actions_per_slice() -> usize {
    DEFAULT_ACTIONS_PER_SLICE
}

fn default_extension() -> String {
    "gqv".to_string()
}

impl CoalescerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.collections_dir {
            Some(ref dir) if dir.as_os_str().is_empty() => {
                return Err("Collections directory cannot be empty".to_string());
            }
            None => return Err("Collections directory is required".to_string()),
            _ => {}
        }
        if self.actions_per_slice == Some(0) {
            return Err("Actions per slice must be at least 1".to_string());
        }
        Ok(())
    }
}

impl From<CoalescerConfigBuilderError> for CollectionError {
    fn from(e: CoalescerConfigBuilderError) -> Self {
        Self::InvalidConfig {
            message: e.to_string(),
        }
    }
}

impl CoalescerConfig {
    /// Create a new config builder.
    pub fn builder() -> CoalescerConfigBuilder {
        CoalescerConfigBuilder::default()
    }

    /// Create a config with defaults for the given collections directory.
    pub fn new(collections_dir: impl Into<PathBuf>) -> Self {
        Self {
            collections_dir: collections_dir.into(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            actions_per_slice: DEFAULT_ACTIONS_PER_SLICE,
            extension: default_extension(),
        }
    }

    /// Debounce period as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Resolve a collection name or path to a collection file path.
    ///
    /// Bare names ("holiday") land in the collections directory and get the
    /// collection extension appended; anything with a directory component is
    /// taken as given.
    pub fn collection_path(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.components().count() > 1 || name.is_absolute() {
            return name.to_path_buf();
        }
        let mut path = self.collections_dir.join(name);
        if !self.is_collection_file(&path) {
            let mut file_name = name.as_os_str().to_os_string();
            file_name.push(".");
            file_name.push(&self.extension);
            path.set_file_name(file_name);
        }
        path
    }

    /// Check if a path carries the collection extension.
    pub fn is_collection_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CoalescerConfig::builder()
            .collections_dir("/home/user/.gallerist/collections")
            .debounce_ms(250u64)
            .build()
            .unwrap();

        assert_eq!(
            config.collections_dir,
            PathBuf::from("/home/user/.gallerist/collections")
        );
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.actions_per_slice, DEFAULT_ACTIONS_PER_SLICE);
        assert_eq!(config.extension, "gqv");
    }

    #[test]
    fn test_config_builder_rejects_bad_values() {
        assert!(CoalescerConfig::builder().build().is_err());
        assert!(CoalescerConfig::builder().collections_dir("").build().is_err());
        assert!(
            CoalescerConfig::builder()
                .collections_dir("/c")
                .actions_per_slice(0usize)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_builder_error_is_invalid_config() {
        let err: CollectionError = CoalescerConfig::builder()
            .collections_dir("/c")
            .actions_per_slice(0usize)
            .build()
            .unwrap_err()
            .into();
        assert!(matches!(err, CollectionError::InvalidConfig { .. }));
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: CoalescerConfig =
            serde_json::from_str(r#"{"collections_dir": "/c"}"#).unwrap();
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.actions_per_slice, DEFAULT_ACTIONS_PER_SLICE);
    }

    #[test]
    fn test_collection_path() {
        let config = CoalescerConfig::new("/c");
        assert_eq!(config.collection_path("trip"), PathBuf::from("/c/trip.gqv"));
        assert_eq!(config.collection_path("trip.gqv"), PathBuf::from("/c/trip.gqv"));
        assert_eq!(
            config.collection_path("/elsewhere/a.gqv"),
            PathBuf::from("/elsewhere/a.gqv")
        );
        assert!(config.is_collection_file(Path::new("/c/x.GQV")));
        assert!(!config.is_collection_file(Path::new("/c/x.txt")));
    }
}
