//! CLI arguments and subcommands for vmmap.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "vmmap",
    about = "Display the virtual memory regions of a process",
    long_about = "Display the virtual memory regions of a process.\n\n\
                  Reads /proc/<pid>/smaps (or /proc/<pid>/maps when smaps is not available), \
                  classifies every mapping into the vmmap region taxonomy and prints the \
                  region tables followed by per-type and per-malloc-zone summaries.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version,
    propagate_version = true,
    args_conflicts_with_subcommands = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Process ID to examine
    pub pid: Option<u32>,

    /// Do not truncate the region detail column
    #[arg(short = 'w', long)]
    pub wide: bool,

    /// Wide output without coalescing adjacent regions
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Report sizes in pages instead of K/M/G
    #[arg(long)]
    pub pages: bool,

    /// Print writable and non-writable regions in one table, in address order
    #[arg(long)]
    pub interleaved: bool,

    /// Only print the summary, not the individual regions
    #[arg(long)]
    pub summary: bool,

    /// Do not merge adjacent identical regions
    #[arg(long)]
    pub no_coalesce: bool,

    /// Report output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Prefix prepended to backing file paths
    #[arg(long)]
    pub root_prefix: Option<String>,

    /// procfs mount point to read process data from
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Log level (written to stderr)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check which memory-map source of a process is readable
    Check {
        /// Process ID to check
        pid: u32,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}
