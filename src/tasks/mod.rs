//! Multi-user todo tasks.
//!
//! This module provides:
//! - Tasks with text, owner, checked and private flags
//! - Ownership-based authorization for the four mutations
//! - A visibility-filtered live change feed per subscriber
//! - Audit logging for all store mutations
//!
//! # Example
//!
//! ```no_run
//! use team_todos::identity::{Caller, StaticUserDirectory};
//! use team_todos::tasks::{SqliteTaskStore, TaskService};
//!
//! let store = SqliteTaskStore::new("/tmp/todos.db").unwrap();
//! let users = StaticUserDirectory::from_users([("u1", "ada")]);
//! let service = TaskService::new(store, Box::new(users));
//!
//! let ada = Caller::user("u1");
//! let id = service.insert(&ada, "Buy milk").unwrap();
//! service.set_checked(&ada, &id, true).unwrap();
//! ```

pub mod feed;
pub mod id;
pub mod models;
pub mod service;
pub mod store;
pub mod view;

pub use feed::{FeedEvent, StoreChange, TaskFeed};
pub use models::{AuditEntry, NewTask, Task};
pub use service::{TaskService, TaskSubscription};
pub use store::{SqliteTaskStore, TaskFilter, TaskStore, TaskUpdate};
