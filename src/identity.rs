//! Caller identity and the user directory.
//!
//! Authentication itself is out of scope: whatever fronts this library
//! (a web session layer, the CLI's `--as` flag) resolves the request to a
//! [`Caller`] before invoking the service. The [`UserDirectory`] trait
//! abstracts the username lookup performed once at task creation.

use crate::error::Result;
use std::collections::HashMap;

/// The identity attached to a request: a signed-in user or anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    user_id: Option<String>,
}

impl Caller {
    /// An unauthenticated caller.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// A caller authenticated as the given user id.
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self { user_id: Some(id.into()) }
    }

    /// The caller's user id, if authenticated.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Whether the caller is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Lookup of display names for user ids.
///
/// This trait abstracts the account system for testability.
pub trait UserDirectory {
    /// Resolve a user id to its display name, or `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing directory cannot be queried.
    fn username(&self, user_id: &str) -> Result<Option<String>>;
}

/// An in-memory user directory backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: HashMap<String, String>,
}

impl StaticUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, replacing any existing entry for the same id.
    pub fn add_user(&mut self, user_id: impl Into<String>, username: impl Into<String>) {
        self.users.insert(user_id.into(), username.into());
    }

    /// Build a directory from `(user_id, username)` pairs.
    pub fn from_users<I, A, B>(users: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            users: users.into_iter().map(|(id, name)| (id.into(), name.into())).collect(),
        }
    }
}

impl UserDirectory for StaticUserDirectory {
    fn username(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.users.get(user_id).cloned())
    }
}
