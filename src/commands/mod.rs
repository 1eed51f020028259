//! CLI command implementations for vmmap.
//!
//! This module provides implementations for the report and all CLI subcommands:
//! - `report`: Memory map report for one process (the default command)
//! - `check`: Source availability check for one process
//! - `config`: Configuration file generation

pub mod check;
pub mod config;
pub mod report;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use report::command_report;
