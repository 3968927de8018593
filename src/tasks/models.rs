//! Task model types.

use crate::identity::Caller;
use serde::{Deserialize, Serialize};

/// A single todo item.
///
/// `text`, `created_at`, `owner`, and `owner_username` are write-once:
/// nothing mutates them after creation. `checked` and `private` are the
/// only mutable fields, each driven by exactly one service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier assigned by the store at creation.
    pub id: String,
    /// The task text, fixed at creation (there is no edit operation).
    pub text: String,
    /// RFC 3339 timestamp of creation.
    pub created_at: String,
    /// User id of the creator; ownership never transfers.
    pub owner: String,
    /// Display name of the owner, snapshotted at creation time and never
    /// re-synced if the user later renames.
    pub owner_username: String,
    /// Whether the task has been checked off.
    pub checked: bool,
    /// Whether the task is visible only to its owner.
    pub private: bool,
}

impl Task {
    /// Whether the given caller owns this task.
    #[must_use]
    pub fn owned_by(&self, caller: &Caller) -> bool {
        caller.user_id() == Some(self.owner.as_str())
    }

    /// The visibility predicate: a task can be seen by everyone unless it
    /// is private, in which case only its owner sees it.
    #[must_use]
    pub fn visible_to(&self, caller: &Caller) -> bool {
        !self.private || self.owned_by(caller)
    }
}

/// Fields supplied by the service when creating a task. The store assigns
/// `id` and `created_at`.
#[derive(Debug, Clone, Copy)]
pub struct NewTask<'a> {
    /// The task text.
    pub text: &'a str,
    /// User id of the creator.
    pub owner: &'a str,
    /// Display name of the creator at creation time.
    pub owner_username: &'a str,
}

/// An entry in the append-only audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for the entry.
    pub id: i64,
    /// Timestamp of the operation.
    pub timestamp: String,
    /// Operation name ("insert", "update", "remove").
    pub operation: String,
    /// Id of the affected task.
    pub task_id: String,
    /// JSON snapshot of the task before the operation, if it existed.
    pub old_value: Option<String>,
    /// JSON snapshot of the task after the operation, if it still exists.
    pub new_value: Option<String>,
}
