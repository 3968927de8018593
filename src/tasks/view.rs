//! Presentation-side helpers.
//!
//! The "hide completed" toggle is pure display state: it filters the
//! received task stream locally and never reaches the service. These
//! helpers exist so renderers (the CLI here) agree on that contract.

use crate::identity::Caller;
use crate::tasks::models::Task;

/// Filter out checked tasks for the "hide completed" display toggle.
pub fn hide_completed(tasks: &[Task]) -> impl Iterator<Item = &Task> {
    tasks.iter().filter(|task| !task.checked)
}

/// Number of unchecked tasks in a rendered list (the list header count).
#[must_use]
pub fn incomplete_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| !task.checked).count()
}

/// Whether the renderer should offer the private/public toggle for a
/// task: only its owner ever sees that control.
#[must_use]
pub fn shows_private_toggle(task: &Task, caller: &Caller) -> bool {
    task.owned_by(caller)
}
