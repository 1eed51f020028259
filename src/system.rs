//! Host system information from /proc and /etc.
//!
//! Provides the OS version string shown in the report overview and the
//! system uptime used to date process launches.

use std::fs;
use std::path::{Path, PathBuf};

/// Source of the "OS Version" line. Injected into rendering so the core
/// never queries the host directly.
pub trait OsVersionSource {
    fn os_version(&self) -> String;
}

/// Reads the distribution name from os-release and the kernel release from
/// procfs, e.g. `Debian GNU/Linux 12 (bookworm) (6.1.0-18-amd64)`.
#[derive(Debug, Clone)]
pub struct ProcOsVersion {
    pub os_release: PathBuf,
    pub kernel_release: PathBuf,
}

impl Default for ProcOsVersion {
    fn default() -> Self {
        Self {
            os_release: PathBuf::from("/etc/os-release"),
            kernel_release: PathBuf::from("/proc/sys/kernel/osrelease"),
        }
    }
}

impl ProcOsVersion {
    fn pretty_name(&self) -> Option<String> {
        let content = fs::read_to_string(&self.os_release).ok()?;
        content.lines().find_map(|line| {
            line.strip_prefix("PRETTY_NAME=")
                .map(|v| v.trim().trim_matches('"').to_string())
        })
    }

    fn kernel(&self) -> Option<String> {
        let release = fs::read_to_string(&self.kernel_release).ok()?;
        let release = release.trim();
        if release.is_empty() {
            None
        } else {
            Some(release.to_string())
        }
    }
}

impl OsVersionSource for ProcOsVersion {
    fn os_version(&self) -> String {
        match (self.pretty_name(), self.kernel()) {
            (Some(name), Some(kernel)) => format!("{} ({})", name, kernel),
            (Some(name), None) => name,
            (None, Some(kernel)) => format!("Linux ({})", kernel),
            (None, None) => String::new(),
        }
    }
}

/// Reads system uptime in seconds from `<proc_root>/uptime`.
pub fn read_uptime(proc_root: &Path) -> Result<f64, String> {
    let path = proc_root.join("uptime");
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let first = content
        .split_whitespace()
        .next()
        .ok_or_else(|| "Invalid uptime format: no fields found".to_string())?;

    first
        .parse::<f64>()
        .map_err(|e| format!("Failed to parse uptime: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_version_from_files() {
        let tmp = tempfile::tempdir().unwrap();
        let os_release = tmp.path().join("os-release");
        let kernel_release = tmp.path().join("osrelease");
        fs::write(&os_release, "NAME=\"Debian\"\nPRETTY_NAME=\"Debian GNU/Linux 12\"\n").unwrap();
        fs::write(&kernel_release, "6.1.0-18-amd64\n").unwrap();

        let source = ProcOsVersion {
            os_release,
            kernel_release,
        };
        assert_eq!(source.os_version(), "Debian GNU/Linux 12 (6.1.0-18-amd64)");
    }

    #[test]
    fn test_os_version_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let source = ProcOsVersion {
            os_release: tmp.path().join("missing"),
            kernel_release: tmp.path().join("also-missing"),
        };
        assert_eq!(source.os_version(), "");
    }

    #[test]
    fn test_read_uptime() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("uptime"), "12345.67 54321.00\n").unwrap();
        assert_eq!(read_uptime(tmp.path()).unwrap(), 12345.67);

        fs::write(tmp.path().join("uptime"), "\n").unwrap();
        assert!(read_uptime(tmp.path()).is_err());
    }
}
