//! The task service: validation, authorization, and mutation.
//!
//! This is the only layer with real rules. Each operation validates its
//! arguments, resolves the caller, enforces the visibility/ownership
//! policy, delegates to the store, and publishes the resulting change to
//! the feed.
//!
//! The authorization policy is deliberately asymmetric: `set_private` is
//! always owner-gated, while `remove` and `set_checked` are gated only
//! when the task is *currently* private. A public task can therefore be
//! checked off or deleted by any caller, authenticated or not. That
//! "public means editable by anyone" rule is the intended contract and is
//! pinned down by tests.

use crate::error::{Error, Result};
use crate::identity::{Caller, UserDirectory};
use crate::tasks::feed::{FeedEvent, StoreChange, TaskFeed};
use crate::tasks::models::{NewTask, Task};
use crate::tasks::store::{TaskFilter, TaskStore, TaskUpdate};
use std::sync::mpsc::Receiver;

/// A live subscription: the tasks visible to the caller at subscribe time,
/// plus a receiver for every subsequent change to that visible set.
pub struct TaskSubscription {
    /// The visible tasks at subscribe time, newest first.
    pub snapshot: Vec<Task>,
    /// Incremental add/change/remove events.
    pub events: Receiver<FeedEvent>,
}

/// The todo-list service over a task store and a user directory.
pub struct TaskService<S: TaskStore> {
    store: S,
    users: Box<dyn UserDirectory>,
    feed: TaskFeed,
}

impl<S: TaskStore> TaskService<S> {
    /// Create a service over the given store and user directory.
    pub fn new(store: S, users: Box<dyn UserDirectory>) -> Self {
        Self { store, users, feed: TaskFeed::new() }
    }

    /// The underlying store (read access for consumers that need it).
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Create a new task owned by the caller.
    ///
    /// Returns the new task's id.
    ///
    /// # Errors
    ///
    /// `Validation` if `text` trims to empty, `NotAuthorized` if the
    /// caller is anonymous, `UnknownUser` if the caller has no entry in
    /// the user directory.
    pub fn insert(&self, caller: &Caller, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("text must be a non-empty string".to_string()));
        }
        let Some(user_id) = caller.user_id() else {
            return Err(Error::NotAuthorized);
        };
        let username = self
            .users
            .username(user_id)?
            .ok_or_else(|| Error::UnknownUser(user_id.to_string()))?;

        let task = self.store.insert_task(NewTask {
            text,
            owner: user_id,
            owner_username: &username,
        })?;
        let id = task.id.clone();
        self.feed.publish(&StoreChange::Added(task));
        Ok(id)
    }

    /// Delete a task.
    ///
    /// A private task can be removed only by its owner; a public one by
    /// any caller.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty id, `TaskNotFound` if no such task
    /// exists, `NotAuthorized` per the policy above.
    pub fn remove(&self, caller: &Caller, task_id: &str) -> Result<()> {
        let task = self.lookup(caller, task_id, Gate::PrivateOwnerOnly)?;
        // If the row vanished between lookup and delete it is already
        // gone, which is the outcome the caller asked for.
        if let Some(removed) = self.store.remove_task(&task.id)? {
            self.feed.publish(&StoreChange::Removed(removed));
        }
        Ok(())
    }

    /// Set a task's checked state. Authorization matches [`Self::remove`]:
    /// owner-only while the task is private, open to everyone otherwise.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty id, `TaskNotFound` if no such task
    /// exists, `NotAuthorized` per the policy above.
    pub fn set_checked(&self, caller: &Caller, task_id: &str, checked: bool) -> Result<()> {
        let task = self.lookup(caller, task_id, Gate::PrivateOwnerOnly)?;
        self.apply_update(task, TaskUpdate { checked: Some(checked), private: None })
    }

    /// Set a task's private flag. Always owner-gated, even while the task
    /// is public.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty id, `TaskNotFound` if no such task
    /// exists, `NotAuthorized` if the caller is not the owner.
    pub fn set_private(&self, caller: &Caller, task_id: &str, private: bool) -> Result<()> {
        let task = self.lookup(caller, task_id, Gate::OwnerOnly)?;
        self.apply_update(task, TaskUpdate { private: Some(private), checked: None })
    }

    /// Subscribe to the caller's visible tasks: a snapshot plus live
    /// events, both filtered by the visibility predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot query fails.
    pub fn subscribe(&self, caller: &Caller) -> Result<TaskSubscription> {
        let snapshot = self.store.list_tasks(&TaskFilter::visible_to(caller))?;
        let events = self.feed.subscribe(caller.clone());
        Ok(TaskSubscription { snapshot, events })
    }

    /// The tasks the caller may see, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn visible_tasks(&self, caller: &Caller) -> Result<Vec<Task>> {
        self.store.list_tasks(&TaskFilter::visible_to(caller))
    }

    /// Number of unchecked tasks among those the caller may see.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn incomplete_count(&self, caller: &Caller) -> Result<u64> {
        self.store.count_tasks(&TaskFilter {
            checked: Some(false),
            ..TaskFilter::visible_to(caller)
        })
    }

    fn lookup(&self, caller: &Caller, task_id: &str, gate: Gate) -> Result<Task> {
        if task_id.is_empty() {
            return Err(Error::Validation("taskId must be a non-empty string".to_string()));
        }
        let task = self
            .store
            .get_task(task_id)?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        let authorized = match gate {
            Gate::OwnerOnly => task.owned_by(caller),
            Gate::PrivateOwnerOnly => !task.private || task.owned_by(caller),
        };
        if !authorized {
            return Err(Error::NotAuthorized);
        }
        Ok(task)
    }

    fn apply_update(&self, old: Task, update: TaskUpdate) -> Result<()> {
        if let Some(new) = self.store.update_task(&old.id, update)? {
            self.feed.publish(&StoreChange::Updated { old, new });
        }
        Ok(())
    }
}

/// Which authorization rule a lookup enforces.
#[derive(Debug, Clone, Copy)]
enum Gate {
    /// Caller must be the owner.
    OwnerOnly,
    /// Caller must be the owner only while the task is private.
    PrivateOwnerOnly,
}
