//! CLI functionality for `team-todos`.
//!
//! This module provides the command-line interface logic, allowing the
//! binary to be a thin wrapper. All functions here are testable: argument
//! parsing is pure, and `run` takes the base directory and caller
//! identity explicitly instead of reading globals.

use crate::config::TodosConfig;
use crate::error::Result;
use crate::identity::{Caller, StaticUserDirectory};
use crate::tasks::view;
use crate::tasks::{SqliteTaskStore, TaskService, TaskStore};
use std::path::Path;

/// CLI command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a new task from the given text.
    Add {
        /// The task text.
        text: String,
    },
    /// List visible tasks.
    List {
        /// Hide checked tasks; `None` defers to the config default.
        hide_completed: Option<bool>,
    },
    /// Set a task's checked state.
    Check {
        /// The task id.
        task_id: String,
        /// The new checked state.
        checked: bool,
    },
    /// Set a task's private flag.
    SetPrivate {
        /// The task id.
        task_id: String,
        /// The new private state.
        private: bool,
    },
    /// Delete a task.
    Remove {
        /// The task id.
        task_id: String,
    },
    /// Show recent audit log entries.
    Log {
        /// Maximum number of entries to show.
        limit: Option<usize>,
    },
    /// Show version information.
    Version,
}

/// Result of parsing CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// Successfully parsed a command.
    Command {
        /// User id from a `--as` flag, if given.
        as_user: Option<String>,
        /// The command to run.
        command: Command,
    },
    /// Show usage (no args provided).
    ShowUsage,
    /// Unknown command.
    UnknownCommand(String),
    /// A required argument was missing.
    MissingArgument(&'static str),
    /// An argument did not parse.
    InvalidArgument(String),
}

/// Parse CLI arguments into a command.
///
/// `args` includes the program name at index 0. A global `--as <user>`
/// flag may appear before the command.
#[must_use]
pub fn parse_args(args: &[String]) -> ParseResult {
    let mut rest = &args[1..];
    let mut as_user = None;

    if rest.first().is_some_and(|a| a == "--as") {
        let Some(user) = rest.get(1) else {
            return ParseResult::MissingArgument("--as requires a user id");
        };
        as_user = Some(user.clone());
        rest = &rest[2..];
    }

    let Some(command) = rest.first() else {
        return ParseResult::ShowUsage;
    };

    let command = match command.as_str() {
        "version" | "--version" | "-v" => Command::Version,
        "add" => {
            let text = rest[1..].join(" ");
            if text.is_empty() {
                return ParseResult::MissingArgument("add requires task text");
            }
            Command::Add { text }
        }
        "list" => match rest.get(1).map(String::as_str) {
            None => Command::List { hide_completed: None },
            Some("--hide-completed") => Command::List { hide_completed: Some(true) },
            Some("--all") => Command::List { hide_completed: Some(false) },
            Some(other) => return ParseResult::InvalidArgument(other.to_string()),
        },
        "check" | "uncheck" => {
            let Some(task_id) = rest.get(1) else {
                return ParseResult::MissingArgument("check/uncheck requires a task id");
            };
            Command::Check { task_id: task_id.clone(), checked: command == "check" }
        }
        "private" | "public" => {
            let Some(task_id) = rest.get(1) else {
                return ParseResult::MissingArgument("private/public requires a task id");
            };
            Command::SetPrivate { task_id: task_id.clone(), private: command == "private" }
        }
        "remove" => {
            let Some(task_id) = rest.get(1) else {
                return ParseResult::MissingArgument("remove requires a task id");
            };
            Command::Remove { task_id: task_id.clone() }
        }
        "log" => match rest.get(1) {
            None => Command::Log { limit: None },
            Some(raw) => match raw.parse() {
                Ok(limit) => Command::Log { limit: Some(limit) },
                Err(_) => return ParseResult::InvalidArgument(raw.clone()),
            },
        },
        other => return ParseResult::UnknownCommand(other.to_string()),
    };

    ParseResult::Command { as_user, command }
}

/// Get the usage string.
#[must_use]
pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [--as <user>] <command> [args]\n\n\
         Commands:\n  \
         add <text...>          Create a new task\n  \
         list [--hide-completed|--all]  List visible tasks\n  \
         check <id>             Mark a task as done\n  \
         uncheck <id>           Mark a task as not done\n  \
         private <id>           Make a task owner-only\n  \
         public <id>            Make a task visible to everyone\n  \
         remove <id>            Delete a task\n  \
         log [limit]            Show recent audit entries\n  \
         version                Show version information\n\n\
         The caller identity comes from --as or the TODOS_USER variable;\n\
         commands without either run unauthenticated."
    )
}

/// Run a parsed CLI invocation against the store under `base_dir`'s
/// configuration.
///
/// `env_user` is the fallback identity (normally `TODOS_USER`). Returns
/// the process exit code and the lines to print.
#[must_use]
pub fn run(args: &[String], base_dir: &Path, env_user: Option<&str>) -> (u8, Vec<String>) {
    let program = args.first().map_or("team-todos", String::as_str);

    let (as_user, command) = match parse_args(args) {
        ParseResult::Command { as_user, command } => (as_user, command),
        ParseResult::ShowUsage => return (2, vec![usage(program)]),
        ParseResult::UnknownCommand(cmd) => {
            return (2, vec![format!("Unknown command: {cmd}"), usage(program)]);
        }
        ParseResult::MissingArgument(what) => return (2, vec![format!("Missing argument: {what}")]),
        ParseResult::InvalidArgument(what) => return (2, vec![format!("Invalid argument: {what}")]),
    };

    let caller = as_user
        .as_deref()
        .or(env_user)
        .map_or_else(Caller::anonymous, Caller::user);

    match execute(&command, &caller, base_dir) {
        Ok(lines) => (0, lines),
        Err(err) => (1, vec![format!("Error: {err}")]),
    }
}

fn execute(command: &Command, caller: &Caller, base_dir: &Path) -> Result<Vec<String>> {
    // Version touches neither config nor store.
    if *command == Command::Version {
        return Ok(vec![format!("team-todos {}", crate::VERSION)]);
    }

    let config = TodosConfig::load_from(base_dir)?.unwrap_or_default();
    let store = SqliteTaskStore::new(config.resolved_db_path())?;
    let service = TaskService::new(store, Box::new(directory_for(caller)));

    match command {
        Command::Add { text } => {
            let id = service.insert(caller, text)?;
            Ok(vec![format!("Added {id}")])
        }
        Command::List { hide_completed } => {
            let hide = hide_completed.unwrap_or(config.hide_completed);
            render_list(&service, caller, hide)
        }
        Command::Check { task_id, checked } => {
            service.set_checked(caller, task_id, *checked)?;
            Ok(vec![format!("{} {task_id}", if *checked { "Checked" } else { "Unchecked" })])
        }
        Command::SetPrivate { task_id, private } => {
            service.set_private(caller, task_id, *private)?;
            Ok(vec![format!(
                "{task_id} is now {}",
                if *private { "private" } else { "public" }
            )])
        }
        Command::Remove { task_id } => {
            service.remove(caller, task_id)?;
            Ok(vec![format!("Removed {task_id}")])
        }
        Command::Log { limit } => {
            let entries = service.store().get_audit_log(None, *limit)?;
            Ok(entries
                .iter()
                .map(|e| format!("{} {:<7} {}", e.timestamp, e.operation, e.task_id))
                .collect())
        }
        Command::Version => Ok(vec![format!("team-todos {}", crate::VERSION)]),
    }
}

/// The CLI has no account system: the caller's id doubles as the display
/// name.
fn directory_for(caller: &Caller) -> StaticUserDirectory {
    let mut directory = StaticUserDirectory::new();
    if let Some(user_id) = caller.user_id() {
        directory.add_user(user_id, user_id);
    }
    directory
}

fn render_list(
    service: &TaskService<SqliteTaskStore>,
    caller: &Caller,
    hide_completed: bool,
) -> Result<Vec<String>> {
    let tasks = service.visible_tasks(caller)?;

    let mut lines = vec![format!("Todo List ({})", view::incomplete_count(&tasks))];
    let shown: Vec<_> = if hide_completed {
        view::hide_completed(&tasks).collect()
    } else {
        tasks.iter().collect()
    };

    for task in shown {
        let mark = if task.checked { 'x' } else { ' ' };
        let mut line = format!("[{mark}] {}  {} — {}", task.id, task.text, task.owner_username);
        if task.private {
            line.push_str(" [private]");
        }
        lines.push(line);
    }

    Ok(lines)
}
