//! Applying an entry's merged changes to a loaded collection.

use gallerist_core::CollectionFile;

use crate::Entry;

/// Replay `entry` against the paths of `collection`.
///
/// Listed paths are renamed or dropped first, then every pending add is
/// appended in the order it arrived. Returns `true` when the listing
/// actually changed and the file needs rewriting; a chain that moved a file
/// back to where it started does not count.
pub fn replay(entry: &mut Entry, collection: &mut CollectionFile) -> bool {
    let mut changed = false;
    let listed = std::mem::take(&mut collection.paths);

    for path in listed {
        let (replayed, matched) = entry.replay_step(Some(&path));
        if !matched {
            collection.paths.push(path);
            continue;
        }
        match replayed {
            Some(new_path) => {
                changed |= new_path != path;
                collection.paths.push(new_path);
            }
            None => changed = true,
        }
    }

    while let (Some(added), true) = entry.replay_step(None) {
        collection.paths.push(added);
        changed = true;
    }

    changed
}
