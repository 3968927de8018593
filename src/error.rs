//! Error types for `team_todos`.

/// Errors that can occur while operating on the todo list.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A `SQLite` database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An argument failed its shape constraint. Raised before any
    /// authorization check or store access.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// The caller lacks permission for the requested mutation. The message
    /// is a fixed code; no further detail is leaked.
    #[error("not-authorized")]
    NotAuthorized,

    /// The referenced task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// An authenticated caller has no entry in the user directory.
    #[error("unknown user: {0}")]
    UnknownUser(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
