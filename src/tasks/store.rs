//! Task store trait and `SQLite` implementation.

use crate::error::Result;
use crate::identity::Caller;
use crate::tasks::id::generate_task_id;
use crate::tasks::models::{AuditEntry, NewTask, Task};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Trait for task storage operations.
///
/// All methods return a `Result` and may fail with database errors.
#[allow(clippy::missing_errors_doc)]
pub trait TaskStore {
    /// Insert a new task, assigning its id and creation timestamp.
    fn insert_task(&self, new: NewTask<'_>) -> Result<Task>;

    /// Get a task by id.
    fn get_task(&self, id: &str) -> Result<Option<Task>>;

    /// Apply a partial update to a task. Returns the updated row, or
    /// `None` if no task with that id exists.
    fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>>;

    /// Remove a task by id. Returns the removed row, or `None` if no task
    /// with that id exists.
    fn remove_task(&self, id: &str) -> Result<Option<Task>>;

    /// List tasks matching a filter, newest first.
    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    /// Count tasks matching a filter.
    fn count_tasks(&self, filter: &TaskFilter) -> Result<u64>;

    /// Get audit log entries, newest first, optionally filtered by task id.
    fn get_audit_log(&self, task_id: Option<&str>, limit: Option<usize>)
        -> Result<Vec<AuditEntry>>;
}

/// The mutable field set of a task. Fields left as `None` are untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskUpdate {
    /// New checked state (if Some).
    pub checked: Option<bool>,
    /// New private state (if Some).
    pub private: Option<bool>,
}

impl TaskUpdate {
    /// Check if any fields are set for update.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.checked.is_none() && self.private.is_none()
    }
}

/// Filter options for listing and counting tasks.
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    /// Restrict to tasks the given caller may see: public tasks plus the
    /// caller's own private ones.
    pub visible_to: Option<Caller>,
    /// Filter by checked state.
    pub checked: Option<bool>,
    /// Filter by owner.
    pub owner: Option<String>,
}

impl TaskFilter {
    /// The visibility-filtered view for a caller.
    #[must_use]
    pub fn visible_to(caller: &Caller) -> Self {
        Self { visible_to: Some(caller.clone()), ..Self::default() }
    }

    fn to_where_clause(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref caller) = self.visible_to {
            if let Some(user_id) = caller.user_id() {
                conditions.push("(private = 0 OR owner = ?)");
                values.push(Box::new(user_id.to_string()));
            } else {
                conditions.push("private = 0");
            }
        }
        if let Some(checked) = self.checked {
            conditions.push("checked = ?");
            values.push(Box::new(checked));
        }
        if let Some(ref owner) = self.owner {
            conditions.push("owner = ?");
            values.push(Box::new(owner.clone()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, values)
    }
}

/// `SQLite`-based task store.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
}

const TASK_COLUMNS: &str = "id, text, created_at, owner, owner_username, checked, private";

impl SqliteTaskStore {
    /// Create a new `SQLite` task store at the given database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self { db_path: db_path.as_ref().to_path_buf() };
        store.init_schema()?;
        Ok(store)
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL CHECK (length(text) > 0),
                created_at TEXT NOT NULL,
                owner TEXT NOT NULL,
                owner_username TEXT NOT NULL,
                checked INTEGER NOT NULL DEFAULT 0,
                private INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner);
            CREATE INDEX IF NOT EXISTS idx_tasks_private ON tasks(private);
            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);

            -- Immutable audit log
            CREATE TABLE IF NOT EXISTS task_audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                operation TEXT NOT NULL,
                task_id TEXT NOT NULL,
                old_value TEXT,
                new_value TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_task_audit_task_id ON task_audit_log(task_id);
            ",
        )?;

        Ok(())
    }

    fn log_audit(
        conn: &Connection,
        operation: &str,
        task_id: &str,
        old_value: Option<&Task>,
        new_value: Option<&Task>,
    ) -> Result<()> {
        let old_json = old_value.map(serde_json::to_string).transpose()?;
        let new_json = new_value.map(serde_json::to_string).transpose()?;
        conn.execute(
            "INSERT INTO task_audit_log (operation, task_id, old_value, new_value)
             VALUES (?1, ?2, ?3, ?4)",
            params![operation, task_id, old_json, new_json],
        )?;
        Ok(())
    }

    fn parse_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            text: row.get(1)?,
            created_at: row.get(2)?,
            owner: row.get(3)?,
            owner_username: row.get(4)?,
            checked: row.get(5)?,
            private: row.get(6)?,
        })
    }

    fn fetch_task(conn: &Connection, id: &str) -> Result<Option<Task>> {
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                Self::parse_task,
            )
            .optional()?;
        Ok(task)
    }
}

impl TaskStore for SqliteTaskStore {
    fn insert_task(&self, new: NewTask<'_>) -> Result<Task> {
        let conn = self.open()?;
        let id = generate_task_id(new.text);
        let created_at = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO tasks (id, text, created_at, owner, owner_username)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&id, new.text, &created_at, new.owner, new.owner_username],
        )?;

        let task = conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![&id],
            Self::parse_task,
        )?;

        Self::log_audit(&conn, "insert", &id, None, Some(&task))?;

        Ok(task)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.open()?;
        Self::fetch_task(&conn, id)
    }

    fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>> {
        let conn = self.open()?;

        let Some(old_task) = Self::fetch_task(&conn, id)? else {
            return Ok(None);
        };

        if update.is_empty() {
            return Ok(Some(old_task));
        }

        let mut assignments = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(checked) = update.checked {
            assignments.push("checked = ?");
            values.push(Box::new(checked));
        }
        if let Some(private) = update.private {
            assignments.push("private = ?");
            values.push(Box::new(private));
        }
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", assignments.join(", "));
        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
        conn.execute(&sql, params.as_slice())?;

        let new_task = conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            Self::parse_task,
        )?;

        Self::log_audit(&conn, "update", id, Some(&old_task), Some(&new_task))?;

        Ok(Some(new_task))
    }

    fn remove_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.open()?;

        let Some(task) = Self::fetch_task(&conn, id)? else {
            return Ok(None);
        };

        let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Ok(None);
        }

        Self::log_audit(&conn, "remove", id, Some(&task), None)?;

        Ok(Some(task))
    }

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let conn = self.open()?;
        let (where_clause, values) = filter.to_where_clause();

        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks {where_clause}
             ORDER BY created_at DESC, rowid DESC"
        );

        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt.query_map(params.as_slice(), Self::parse_task)?.flatten().collect();

        Ok(tasks)
    }

    #[allow(clippy::cast_sign_loss)]
    fn count_tasks(&self, filter: &TaskFilter) -> Result<u64> {
        let conn = self.open()?;
        let (where_clause, values) = filter.to_where_clause();

        let sql = format!("SELECT COUNT(*) FROM tasks {where_clause}");
        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
        let count: i64 = conn.query_row(&sql, params.as_slice(), |row| row.get(0))?;

        Ok(count as u64)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn get_audit_log(
        &self,
        task_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>> {
        let conn = self.open()?;

        let mut conditions = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(id) = task_id {
            conditions.push("WHERE task_id = ?");
            values.push(Box::new(id.to_string()));
        }
        let limit_clause = if let Some(lim) = limit {
            values.push(Box::new(lim as i64));
            "LIMIT ?"
        } else {
            ""
        };

        let sql = format!(
            "SELECT id, timestamp, operation, task_id, old_value, new_value
             FROM task_audit_log {} ORDER BY id DESC {limit_clause}",
            conditions.join(" "),
        );

        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params.as_slice(), |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    operation: row.get(2)?,
                    task_id: row.get(3)?,
                    old_value: row.get(4)?,
                    new_value: row.get(5)?,
                })
            })?
            .flatten()
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteTaskStore) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteTaskStore::new(&db_path).unwrap();
        (dir, store)
    }

    fn new_task<'a>(text: &'a str, owner: &'a str) -> NewTask<'a> {
        NewTask { text, owner, owner_username: owner }
    }

    #[test]
    fn test_insert_and_get_task() {
        let (_dir, store) = create_test_store();

        let task = store
            .insert_task(NewTask { text: "Buy milk", owner: "u1", owner_username: "ada" })
            .unwrap();
        assert!(task.id.starts_with("buy-milk-"));
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.owner, "u1");
        assert_eq!(task.owner_username, "ada");
        assert!(!task.checked);
        assert!(!task.private);
        assert!(!task.created_at.is_empty());

        let fetched = store.get_task(&task.id).unwrap().unwrap();
        assert_eq!(fetched, task);
    }

    #[test]
    fn test_get_nonexistent_task() {
        let (_dir, store) = create_test_store();
        assert!(store.get_task("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_update_checked_only_touches_checked() {
        let (_dir, store) = create_test_store();

        let task = store.insert_task(new_task("Buy milk", "u1")).unwrap();
        let updated = store
            .update_task(&task.id, TaskUpdate { checked: Some(true), private: None })
            .unwrap()
            .unwrap();

        assert!(updated.checked);
        assert!(!updated.private);
        assert_eq!(updated.text, task.text);
        assert_eq!(updated.created_at, task.created_at);
        assert_eq!(updated.owner, task.owner);
    }

    #[test]
    fn test_update_private_only_touches_private() {
        let (_dir, store) = create_test_store();

        let task = store.insert_task(new_task("Buy milk", "u1")).unwrap();
        let updated = store
            .update_task(&task.id, TaskUpdate { private: Some(true), checked: None })
            .unwrap()
            .unwrap();

        assert!(updated.private);
        assert!(!updated.checked);
    }

    #[test]
    fn test_update_nonexistent_task() {
        let (_dir, store) = create_test_store();
        let result = store
            .update_task("nonexistent", TaskUpdate { checked: Some(true), private: None })
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_update_is_a_read() {
        let (_dir, store) = create_test_store();

        let task = store.insert_task(new_task("Buy milk", "u1")).unwrap();
        let result = store.update_task(&task.id, TaskUpdate::default()).unwrap().unwrap();
        assert_eq!(result, task);

        // No "update" entry was logged.
        let log = store.get_audit_log(Some(&task.id), None).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].operation, "insert");
    }

    #[test]
    fn test_remove_task_returns_removed_row() {
        let (_dir, store) = create_test_store();

        let task = store.insert_task(new_task("Buy milk", "u1")).unwrap();
        let removed = store.remove_task(&task.id).unwrap().unwrap();
        assert_eq!(removed.id, task.id);
        assert!(store.get_task(&task.id).unwrap().is_none());

        // Remove again returns None.
        assert!(store.remove_task(&task.id).unwrap().is_none());
    }

    #[test]
    fn test_list_tasks_newest_first() {
        let (_dir, store) = create_test_store();

        let first = store.insert_task(new_task("first", "u1")).unwrap();
        let second = store.insert_task(new_task("second", "u1")).unwrap();
        let third = store.insert_task(new_task("third", "u1")).unwrap();

        let tasks = store.list_tasks(&TaskFilter::default()).unwrap();
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);
    }

    #[test]
    fn test_visibility_filter_authenticated() {
        let (_dir, store) = create_test_store();

        let public_own = store.insert_task(new_task("mine public", "u1")).unwrap();
        let private_own = store.insert_task(new_task("mine private", "u1")).unwrap();
        store
            .update_task(&private_own.id, TaskUpdate { private: Some(true), checked: None })
            .unwrap();
        let public_other = store.insert_task(new_task("theirs public", "u2")).unwrap();
        let private_other = store.insert_task(new_task("theirs private", "u2")).unwrap();
        store
            .update_task(&private_other.id, TaskUpdate { private: Some(true), checked: None })
            .unwrap();

        let visible = store.list_tasks(&TaskFilter::visible_to(&Caller::user("u1"))).unwrap();
        let ids: Vec<_> = visible.iter().map(|t| t.id.as_str()).collect();
        assert!(ids.contains(&public_own.id.as_str()));
        assert!(ids.contains(&private_own.id.as_str()));
        assert!(ids.contains(&public_other.id.as_str()));
        assert!(!ids.contains(&private_other.id.as_str()));
    }

    #[test]
    fn test_visibility_filter_anonymous() {
        let (_dir, store) = create_test_store();

        store.insert_task(new_task("public", "u1")).unwrap();
        let hidden = store.insert_task(new_task("private", "u1")).unwrap();
        store.update_task(&hidden.id, TaskUpdate { private: Some(true), checked: None }).unwrap();

        let visible = store.list_tasks(&TaskFilter::visible_to(&Caller::anonymous())).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].text, "public");
    }

    #[test]
    fn test_count_incomplete() {
        let (_dir, store) = create_test_store();

        store.insert_task(new_task("one", "u1")).unwrap();
        let done = store.insert_task(new_task("two", "u1")).unwrap();
        store.update_task(&done.id, TaskUpdate { checked: Some(true), private: None }).unwrap();

        let incomplete = store
            .count_tasks(&TaskFilter { checked: Some(false), ..TaskFilter::default() })
            .unwrap();
        assert_eq!(incomplete, 1);
    }

    #[test]
    fn test_count_with_owner_filter() {
        let (_dir, store) = create_test_store();

        store.insert_task(new_task("a", "u1")).unwrap();
        store.insert_task(new_task("b", "u1")).unwrap();
        store.insert_task(new_task("c", "u2")).unwrap();

        let filter = TaskFilter { owner: Some("u1".to_string()), ..TaskFilter::default() };
        assert_eq!(store.count_tasks(&filter).unwrap(), 2);
    }

    #[test]
    fn test_audit_log_records_lifecycle() {
        let (_dir, store) = create_test_store();

        let task = store.insert_task(new_task("Buy milk", "u1")).unwrap();
        store.update_task(&task.id, TaskUpdate { checked: Some(true), private: None }).unwrap();
        store.remove_task(&task.id).unwrap();

        let log = store.get_audit_log(Some(&task.id), None).unwrap();
        let ops: Vec<_> = log.iter().map(|e| e.operation.as_str()).collect();
        assert_eq!(ops, vec!["remove", "update", "insert"]);

        // The update entry carries before/after snapshots.
        let update = &log[1];
        let old: Task = serde_json::from_str(update.old_value.as_deref().unwrap()).unwrap();
        let new: Task = serde_json::from_str(update.new_value.as_deref().unwrap()).unwrap();
        assert!(!old.checked);
        assert!(new.checked);
    }

    #[test]
    fn test_audit_log_limit() {
        let (_dir, store) = create_test_store();

        for i in 0..5 {
            store.insert_task(new_task(&format!("task {i}"), "u1")).unwrap();
        }

        let log = store.get_audit_log(None, Some(3)).unwrap();
        assert_eq!(log.len(), 3);
    }
}
