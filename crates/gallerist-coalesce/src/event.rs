//! Change notifications accepted by the coalescer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A file-system change that may affect collection files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A file was moved or renamed.
    Moved { from: PathBuf, to: PathBuf },
    /// A file was added to a collection.
    Added { file: PathBuf, collection: PathBuf },
    /// A file was removed from a collection.
    Removed { file: PathBuf, collection: PathBuf },
}

impl ChangeEvent {
    /// Create a move event.
    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::Moved {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create an add event.
    pub fn added(file: impl Into<PathBuf>, collection: impl Into<PathBuf>) -> Self {
        Self::Added {
            file: file.into(),
            collection: collection.into(),
        }
    }

    /// Create a remove event.
    pub fn removed(file: impl Into<PathBuf>, collection: impl Into<PathBuf>) -> Self {
        Self::Removed {
            file: file.into(),
            collection: collection.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_tagged() {
        let events: Vec<ChangeEvent> = serde_json::from_str(
            r#"[
                {"event": "moved", "from": "/a.jpg", "to": "/b.jpg"},
                {"event": "added", "file": "/c.jpg", "collection": "trip"},
                {"event": "removed", "file": "/d.jpg", "collection": "/c/trip.gqv"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            events,
            vec![
                ChangeEvent::moved("/a.jpg", "/b.jpg"),
                ChangeEvent::added("/c.jpg", "trip"),
                ChangeEvent::removed("/d.jpg", "/c/trip.gqv"),
            ]
        );
    }
}
