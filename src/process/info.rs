//! Process metadata used by the report overview.
//!
//! Reads name, executable path, parent and launch time of the target from
//! /proc, and probes whether the target exists and may be examined.

use chrono::{DateTime, Duration, Local};
use nix::errno::Errno;
use nix::unistd::{getpgid, Pid};
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, VmmapError};
use crate::region::{RegionEntry, RegionType};
use crate::system::read_uptime;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
}

/// System clock ticks per second (for converting `starttime`).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Metadata of the inspected process. Missing values render as `???`.
#[derive(Debug, Clone, Default)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: Option<String>,
    pub path: Option<String>,
    pub parent_pid: Option<u32>,
    pub parent_name: Option<String>,
    pub start_time: Option<DateTime<Local>>,
}

/// Distinguishes a missing target from one we may not examine.
pub fn check_target(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid).map_err(|_| VmmapError::ProcessUnavailable { pid })?;
    match getpgid(Some(Pid::from_raw(raw))) {
        Ok(_) => Ok(()),
        Err(Errno::EPERM) => Err(VmmapError::InsufficientPrivilege { pid }),
        Err(e) => {
            debug!("getpgid({}) failed: {}", pid, e);
            Err(VmmapError::ProcessUnavailable { pid })
        }
    }
}

/// Reads the process name from `comm`.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    let s = fs::read_to_string(proc_path.join("comm")).ok()?;
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// `/proc/<pid>/stat` fields after the parenthesised command name.
/// Index 0 is field 3 (state).
fn read_stat_fields(proc_path: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(proc_path.join("stat")).ok()?;
    let rest = &content[content.rfind(')')? + 1..];
    Some(rest.split_whitespace().map(str::to_string).collect())
}

/// Parent pid (stat field 4).
fn parse_parent_pid(fields: &[String]) -> Option<u32> {
    fields.get(1)?.parse().ok()
}

/// Seconds since boot at which the process started (stat field 22).
fn parse_start_seconds(fields: &[String]) -> Option<f64> {
    let jiffies: u64 = fields.get(19)?.parse().ok()?;
    Some(jiffies as f64 / *CLK_TCK)
}

/// Collects overview metadata for `pid`. Never fails; unknown values stay `None`.
pub fn read_process_info(proc_root: &Path, pid: u32) -> ProcessInfo {
    let proc_path = proc_root.join(pid.to_string());
    let fields = read_stat_fields(&proc_path).unwrap_or_default();

    let parent_pid = parse_parent_pid(&fields);
    let parent_name =
        parent_pid.and_then(|ppid| read_process_name(&proc_root.join(ppid.to_string())));

    let start_time = parse_start_seconds(&fields).and_then(|started| {
        let uptime = read_uptime(proc_root).ok()?;
        let age_ms = ((uptime - started).max(0.0) * 1000.0) as i64;
        Some(Local::now() - Duration::milliseconds(age_ms))
    });

    let path = fs::read_link(proc_path.join("exe"))
        .ok()
        .map(|p| p.to_string_lossy().into_owned());

    ProcessInfo {
        pid,
        name: read_process_name(&proc_path),
        path,
        parent_pid,
        parent_name,
        start_time,
    }
}

/// Start address of the main executable: the first `__TEXT` region whose
/// backing path ends with the executable path.
pub fn load_address(entries: &[RegionEntry], exe_path: &str) -> Option<u64> {
    if exe_path.is_empty() {
        return None;
    }
    entries
        .iter()
        .find(|e| e.region_type == RegionType::Text && e.detail.ends_with(exe_path))
        .map(|e| e.start_address)
}
