//! Configuration management for vmmap.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use clap::ValueEnum;
use herakles_vmmap::process::DEFAULT_ROOT_PREFIX;
use herakles_vmmap::units::host_page_size;
use herakles_vmmap::{ClassifyContext, ReportOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat, LogLevel, OutputFormat};

// Default configuration constants
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Default config file locations, first match wins.
const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "/etc/herakles/vmmap.yaml",
    "./herakles-vmmap.yaml",
    "./herakles-vmmap.yml",
    "./herakles-vmmap.json",
];

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Report layout
    pub wide: Option<bool>,
    pub pages: Option<bool>,
    pub interleaved: Option<bool>,
    pub summary: Option<bool>,
    #[serde(alias = "no-coalesce")]
    pub no_coalesce: Option<bool>,
    #[serde(alias = "output-format")]
    pub output_format: Option<OutputFormat>,

    // Paths
    #[serde(alias = "root-prefix")]
    pub root_prefix: Option<String>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wide: Some(false),
            pages: Some(false),
            interleaved: Some(false),
            summary: Some(false),
            no_coalesce: Some(false),
            output_format: Some(OutputFormat::Text),
            root_prefix: Some(DEFAULT_ROOT_PREFIX.to_string()),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            log_level: Some(DEFAULT_LOG_LEVEL.into()),
        }
    }
}

impl Config {
    /// Report display options from the effective values.
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            wide: self.wide.unwrap_or(false),
            pages: self.pages.unwrap_or(false),
            interleaved: self.interleaved.unwrap_or(false),
            summary: self.summary.unwrap_or(false),
            no_coalesce: self.no_coalesce.unwrap_or(false),
        }
    }

    pub fn classify_context(&self) -> ClassifyContext {
        ClassifyContext {
            host_page_size: host_page_size(),
            root_prefix: self
                .root_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_ROOT_PREFIX.to_string()),
        }
    }

    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.unwrap_or_default()
    }

    /// Parsed log level; unknown names fall back to the default.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|s| LogLevel::from_str(s, true).ok())
            .unwrap_or(LogLevel::Warn)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(prefix) = cfg.root_prefix.as_deref() {
        // An empty prefix means backing paths are shown unchanged
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(format!("root_prefix must be an absolute path, got '{}'", prefix).into());
        }
    }

    if let Some(proc_root) = cfg.proc_root.as_deref() {
        if proc_root.as_os_str().is_empty() {
            return Err("proc_root must not be empty".into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_str(level, true).is_err() {
            return Err(format!(
                "Invalid log_level '{}', expected one of off, error, warn, info, debug, trace",
                level
            )
            .into());
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Flags only ever switch behavior on
    if args.wide {
        config.wide = Some(true);
    }
    if args.pages {
        config.pages = Some(true);
    }
    if args.interleaved {
        config.interleaved = Some(true);
    }
    if args.summary {
        config.summary = Some(true);
    }
    if args.no_coalesce {
        config.no_coalesce = Some(true);
    }
    if args.verbose {
        config.wide = Some(true);
        config.no_coalesce = Some(true);
    }

    if let Some(format) = args.format {
        config.output_format = Some(format);
    }
    if let Some(prefix) = &args.root_prefix {
        config.root_prefix = Some(prefix.clone());
    }
    if let Some(proc_root) = &args.proc_root {
        config.proc_root = Some(proc_root.clone());
    }
    if let Some(level) = args.log_level {
        if let Some(value) = level.to_possible_value() {
            config.log_level = Some(value.get_name().to_string());
        }
    }

    Ok(config)
}

/// Configuration loading with multiple format support.
/// Missing values in the file keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;

    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            config
        }
        Some("toml") => {
            let config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            config
        }
        _ => {
            // Default to YAML
            let config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            config
        }
    };

    Ok(merge_defaults(loaded))
}

fn merge_defaults(loaded: Config) -> Config {
    let defaults = Config::default();
    Config {
        wide: loaded.wide.or(defaults.wide),
        pages: loaded.pages.or(defaults.pages),
        interleaved: loaded.interleaved.or(defaults.interleaved),
        summary: loaded.summary.or(defaults.summary),
        no_coalesce: loaded.no_coalesce.or(defaults.no_coalesce),
        output_format: loaded.output_format.or(defaults.output_format),
        root_prefix: loaded.root_prefix.or(defaults.root_prefix),
        proc_root: loaded.proc_root.or(defaults.proc_root),
        log_level: loaded.log_level.or(defaults.log_level),
    }
}

/// Serializes configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let output = render_config(config, format)?;
    println!("{output}");
    Ok(())
}
