//! # `team_todos`
//!
//! A small multi-user todo list: authenticated users create text tasks,
//! anyone toggles or removes public ones, owners control privacy, and
//! subscribers receive a visibility-filtered live change feed.

pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod tasks;

pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
