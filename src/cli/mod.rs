// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for the gaze watch loop.
//!
//! This module contains the command-line interface logic, including argument
//! parsing, logging macros, and the `watch` command implementation.

// Modules
/// CLI arguments.
pub mod args;

/// Verbosity state and logging macros.
pub mod logging;

/// Watch command logic.
pub mod watch;
