//! FIFO of actions waiting to be handed to entries.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use crate::Action;

/// An action waiting in the queue.
#[derive(Debug, Clone)]
pub struct QueuedAction {
    action: Rc<Action>,
    target: Option<PathBuf>,
}

impl QueuedAction {
    /// A move, offered to every collection.
    pub fn broadcast(action: Action) -> Self {
        Self {
            action: Rc::new(action),
            target: None,
        }
    }

    /// A change bound to a single collection file.
    pub fn targeted(action: Action, collection: impl Into<PathBuf>) -> Self {
        Self {
            action: Rc::new(action),
            target: Some(collection.into()),
        }
    }

    /// Split into the shared action and its target.
    pub fn into_parts(self) -> (Rc<Action>, Option<PathBuf>) {
        (self.action, self.target)
    }
}

/// Arrival-ordered queue of pending actions.
#[derive(Debug, Default)]
pub struct ActionQueue {
    items: VecDeque<QueuedAction>,
}

impl ActionQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail.
    pub fn push(&mut self, queued: QueuedAction) {
        self.items.push_back(queued);
    }

    /// Take up to `max` actions, oldest first.
    pub fn drain_batch(&mut self, max: usize) -> impl Iterator<Item = QueuedAction> + '_ {
        let n = max.min(self.items.len());
        self.items.drain(..n)
    }

    /// Number of queued actions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = ActionQueue::new();
        queue.push(QueuedAction::broadcast(Action::update("/a", "/b")));
        queue.push(QueuedAction::targeted(Action::add("/c"), "/coll.gqv"));

        let mut batch = queue.drain_batch(usize::MAX).map(QueuedAction::into_parts);

        let (first, target) = batch.next().unwrap();
        assert_eq!(first.source(), Some(Path::new("/a")));
        assert!(target.is_none());

        let (second, target) = batch.next().unwrap();
        assert_eq!(second.dest(), Some(Path::new("/c")));
        assert_eq!(target.as_deref(), Some(Path::new("/coll.gqv")));
        assert!(batch.next().is_none());
    }

    #[test]
    fn test_drain_batch_is_bounded() {
        let mut queue = ActionQueue::new();
        for i in 0..5 {
            queue.push(QueuedAction::broadcast(Action::remove(format!("/{i}"))));
        }

        let batch: Vec<_> = queue.drain_batch(3).map(QueuedAction::into_parts).collect();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].0.source(), Some(Path::new("/0")));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.drain_batch(10).count(), 2);
        assert!(queue.is_empty());
    }
}
