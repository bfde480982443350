//! Command handlers for the vecgate CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod documents;
pub mod health;
pub mod index;
pub mod search;
pub mod serve;

// Re-export command types for convenience
pub use documents::{AddCommand, DeleteCommand, GetCommand};
pub use health::HealthCommand;
pub use index::IndexCommand;
pub use search::SearchCommand;
pub use serve::ServeCommand;

use serde::Serialize;
use vecgate_core::AppResult;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
