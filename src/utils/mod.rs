//!
//! Utility module for the sync engine.
//!
//! Re-exports formatting helpers used by notifications and the CLI.
/// Utility functions for formatting and display
pub mod index;

pub use index::pluralize;
