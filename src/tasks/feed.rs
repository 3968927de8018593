//! Live change feed for tasks.
//!
//! The service publishes every store mutation as a [`StoreChange`]; the
//! feed fans it out to subscribers, filtering each change through the
//! visibility predicate for the subscriber's identity. A task turning
//! private is delivered to non-owners as a removal, and one turning public
//! as an addition, so every subscriber's view stays consistent with what
//! they are allowed to see.
//!
//! Delivery is per-subscriber ordered (publishes happen under one lock)
//! but makes no ordering promise across subscribers. Subscribers whose
//! receiver has been dropped are pruned on the next publish.

use crate::identity::Caller;
use crate::tasks::models::Task;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

/// A mutation applied to the task store, carrying enough state to decide
/// per-subscriber visibility before and after.
#[derive(Debug, Clone)]
pub enum StoreChange {
    /// A task was inserted.
    Added(Task),
    /// A task was updated in place.
    Updated {
        /// The row before the update.
        old: Task,
        /// The row after the update.
        new: Task,
    },
    /// A task was deleted.
    Removed(Task),
}

/// An event as observed by a single subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A task entered the subscriber's visible set.
    Added(Task),
    /// A visible task changed.
    Changed(Task),
    /// A task left the subscriber's visible set; only the id survives.
    Removed(String),
}

struct SubscriberEntry {
    caller: Caller,
    sender: Sender<FeedEvent>,
}

impl SubscriberEntry {
    /// Translate a store change into what this subscriber should see, if
    /// anything.
    fn event_for(&self, change: &StoreChange) -> Option<FeedEvent> {
        match change {
            StoreChange::Added(task) => {
                task.visible_to(&self.caller).then(|| FeedEvent::Added(task.clone()))
            }
            StoreChange::Removed(task) => {
                task.visible_to(&self.caller).then(|| FeedEvent::Removed(task.id.clone()))
            }
            StoreChange::Updated { old, new } => {
                let before = old.visible_to(&self.caller);
                let after = new.visible_to(&self.caller);
                match (before, after) {
                    (true, true) => Some(FeedEvent::Changed(new.clone())),
                    (true, false) => Some(FeedEvent::Removed(new.id.clone())),
                    (false, true) => Some(FeedEvent::Added(new.clone())),
                    (false, false) => None,
                }
            }
        }
    }
}

/// Fan-out hub from store changes to per-caller event streams.
#[derive(Default)]
pub struct TaskFeed {
    subscribers: Mutex<Vec<SubscriberEntry>>,
}

impl TaskFeed {
    /// Create a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and return its event receiver.
    ///
    /// The caller identity is fixed at subscribe time; the initial
    /// snapshot is the service's responsibility (it reads the store under
    /// the same identity before events start flowing).
    pub fn subscribe(&self, caller: Caller) -> Receiver<FeedEvent> {
        let (sender, receiver) = channel();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.push(SubscriberEntry { caller, sender });
        receiver
    }

    /// Deliver a store change to every subscriber that can see it.
    pub fn publish(&self, change: &StoreChange) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.retain(|entry| match entry.event_for(change) {
            // A send error means the receiver is gone; drop the entry.
            Some(event) => entry.sender.send(event).is_ok(),
            None => true,
        });
    }

    /// Number of live subscribers (for tests and introspection).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, owner: &str, private: bool) -> Task {
        Task {
            id: id.to_string(),
            text: "Buy milk".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            owner: owner.to_string(),
            owner_username: owner.to_string(),
            checked: false,
            private,
        }
    }

    #[test]
    fn test_added_reaches_everyone_when_public() {
        let feed = TaskFeed::new();
        let owner_rx = feed.subscribe(Caller::user("u1"));
        let other_rx = feed.subscribe(Caller::user("u2"));
        let anon_rx = feed.subscribe(Caller::anonymous());

        let t = task("t-1", "u1", false);
        feed.publish(&StoreChange::Added(t.clone()));

        assert_eq!(owner_rx.try_recv().unwrap(), FeedEvent::Added(t.clone()));
        assert_eq!(other_rx.try_recv().unwrap(), FeedEvent::Added(t.clone()));
        assert_eq!(anon_rx.try_recv().unwrap(), FeedEvent::Added(t));
    }

    #[test]
    fn test_private_added_reaches_owner_only() {
        let feed = TaskFeed::new();
        let owner_rx = feed.subscribe(Caller::user("u1"));
        let other_rx = feed.subscribe(Caller::user("u2"));

        let t = task("t-1", "u1", true);
        feed.publish(&StoreChange::Added(t.clone()));

        assert_eq!(owner_rx.try_recv().unwrap(), FeedEvent::Added(t));
        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn test_going_private_removes_from_other_views() {
        let feed = TaskFeed::new();
        let owner_rx = feed.subscribe(Caller::user("u1"));
        let other_rx = feed.subscribe(Caller::user("u2"));

        let old = task("t-1", "u1", false);
        let mut new = old.clone();
        new.private = true;
        feed.publish(&StoreChange::Updated { old, new: new.clone() });

        assert_eq!(owner_rx.try_recv().unwrap(), FeedEvent::Changed(new));
        assert_eq!(other_rx.try_recv().unwrap(), FeedEvent::Removed("t-1".to_string()));
    }

    #[test]
    fn test_going_public_adds_to_other_views() {
        let feed = TaskFeed::new();
        let other_rx = feed.subscribe(Caller::user("u2"));

        let old = task("t-1", "u1", true);
        let mut new = old.clone();
        new.private = false;
        feed.publish(&StoreChange::Updated { old, new: new.clone() });

        assert_eq!(other_rx.try_recv().unwrap(), FeedEvent::Added(new));
    }

    #[test]
    fn test_private_change_invisible_to_non_owner() {
        let feed = TaskFeed::new();
        let other_rx = feed.subscribe(Caller::user("u2"));

        let old = task("t-1", "u1", true);
        let mut new = old.clone();
        new.checked = true;
        feed.publish(&StoreChange::Updated { old, new });

        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn test_removed_delivered_only_where_visible() {
        let feed = TaskFeed::new();
        let owner_rx = feed.subscribe(Caller::user("u1"));
        let other_rx = feed.subscribe(Caller::user("u2"));

        feed.publish(&StoreChange::Removed(task("t-1", "u1", true)));

        assert_eq!(owner_rx.try_recv().unwrap(), FeedEvent::Removed("t-1".to_string()));
        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let feed = TaskFeed::new();
        let rx = feed.subscribe(Caller::user("u1"));
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);
        feed.publish(&StoreChange::Added(task("t-1", "u1", false)));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_per_subscriber_ordering() {
        let feed = TaskFeed::new();
        let rx = feed.subscribe(Caller::user("u1"));

        for i in 0..5 {
            feed.publish(&StoreChange::Added(task(&format!("t-{i}"), "u1", false)));
        }

        let ids: Vec<_> = (0..5)
            .map(|_| match rx.try_recv().unwrap() {
                FeedEvent::Added(t) => t.id,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec!["t-0", "t-1", "t-2", "t-3", "t-4"]);
    }
}
