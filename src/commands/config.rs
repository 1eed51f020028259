//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("herakles-vmmap.yaml"),
    };

    let mut content = render_config(&config, format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles vmmap Configuration
# ============================
#
# Report Layout
# -------------
# wide: false                  # Never truncate the region detail column
# pages: false                 # Report sizes in pages instead of K/M/G
# interleaved: false           # One region table in address order
# summary: false               # Only print the summary tables
# no_coalesce: false           # Keep adjacent identical regions separate
# output_format: text          # text, json, yaml
#
# Paths
# -----
# root_prefix: "/Volumes/SystemRoot"  # Prepended to backing file paths ("" = none)
# proc_root: "/proc"           # procfs mount point
#
# Logging
# -------
# log_level: "warn"            # off, error, warn, info, debug, trace (stderr)
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_config_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vmmap.yaml");
        command_config(Some(path.clone()), ConfigFormat::Yaml, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Herakles vmmap Configuration"));
        let parsed: Config = serde_yaml::from_str(&content).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
