//! Memory map parsing from /proc.
//!
//! This module reads `/proc/<pid>/smaps` (detailed form) or, when that is not
//! available, `/proc/<pid>/maps` (minimal form), and folds the text into one
//! [`RawRegionRecord`] per mapping.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, VmmapError};

/// Read buffer for smaps/maps files. smaps of large processes easily exceeds
/// a few hundred KB.
pub const SMAPS_BUFFER_KB: usize = 512;

/// `start-end perms offset major:minor inode [description]`
static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9a-fA-F]+)-([0-9a-fA-F]+)\s+([rwxsp-]{4})\s+([0-9a-fA-F]+)\s+([0-9a-fA-F]+):([0-9a-fA-F]+)\s+([0-9]+)(?:\s+(.*))?$",
    )
    .expect("header pattern is valid")
});

/// `Label: value` detail line. The label never contains a colon.
static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([^:\s][^:]*?)\s*:\s*(.*?)\s*$").expect("attribute pattern is valid"));

/// One mapping as it appears in the source, before classification.
#[derive(Debug, Clone, Default)]
pub struct RawRegionRecord {
    pub start: u64,
    pub end: u64,
    pub permissions: String,
    pub offset: u64,
    pub device: String,
    pub inode: u64,
    pub description: String,
    pub attributes: HashMap<String, String>,
}

/// Which of the two memory-map sources was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    /// `/proc/<pid>/smaps`: headers followed by attribute blocks.
    Detailed,
    /// `/proc/<pid>/maps`: header lines only.
    Minimal,
}

impl MapFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            MapFormat::Detailed => "smaps",
            MapFormat::Minimal => "maps",
        }
    }
}

/// Memory-map text loaded from one source.
#[derive(Debug, Clone)]
pub struct MapSource {
    pub format: MapFormat,
    pub path: PathBuf,
    pub text: String,
}

/// Outcome of trying one source: either loaded, or absent/unreadable in a
/// way that lets the caller try the next source.
#[derive(Debug)]
pub enum SourceAttempt {
    Loaded(MapSource),
    TryNext(io::Error),
}

/// Parses a header line into a fresh record. `None` if the line is not a
/// header at all; `Some(None)` if it is a header with an unusable range.
fn parse_header(line: &str) -> Option<Option<RawRegionRecord>> {
    let caps = HEADER_RE.captures(line)?;

    let hex = |i: usize| u64::from_str_radix(&caps[i], 16).ok();
    let (Some(start), Some(end), Some(offset)) = (hex(1), hex(2), hex(4)) else {
        return Some(None);
    };
    let Ok(inode) = caps[7].parse::<u64>() else {
        return Some(None);
    };
    if end <= start {
        return Some(None);
    }

    Some(Some(RawRegionRecord {
        start,
        end,
        permissions: caps[3].to_string(),
        offset,
        device: format!("{}:{}", &caps[5], &caps[6]),
        inode,
        description: caps
            .get(8)
            .map(|m| m.as_str().trim_end().to_string())
            .unwrap_or_default(),
        attributes: HashMap::new(),
    }))
}

/// Parses a `Label: value` detail line.
pub fn parse_attribute(line: &str) -> Option<(&str, &str)> {
    let caps = ATTRIBUTE_RE.captures(line)?;
    let label = caps.get(1)?.as_str();
    let value = caps.get(2).map_or("", |m| m.as_str());
    Some((label, value))
}

/// Folds memory-map text into records, in source order.
///
/// Header lines open a new record (emitting the previous one); detail lines
/// attach to the open record; anything else is skipped.
pub fn parse_region_records(text: &str) -> Vec<RawRegionRecord> {
    let mut records = Vec::new();
    let mut current: Option<RawRegionRecord> = None;

    for (lineno, line) in text.lines().enumerate() {
        if let Some(header) = parse_header(line) {
            if let Some(done) = current.take() {
                records.push(done);
            }
            if header.is_none() {
                debug!("Skipping region header with unusable range at line {}", lineno + 1);
            }
            current = header;
            continue;
        }

        if let Some((label, value)) = parse_attribute(line) {
            if let Some(record) = current.as_mut() {
                record.attributes.insert(label.to_string(), value.to_string());
            }
        }
    }

    if let Some(done) = current {
        records.push(done);
    }

    records
}

/// Tries to load one source. Failing to open is recoverable; failing while
/// reading an opened file is not.
pub fn attempt_source(path: &Path, format: MapFormat) -> Result<SourceAttempt> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) => return Ok(SourceAttempt::TryNext(e)),
    };

    let mut reader = BufReader::with_capacity(SMAPS_BUFFER_KB * 1024, file);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    // Backing paths may hold arbitrary bytes; keep them as U+FFFD
    Ok(SourceAttempt::Loaded(MapSource {
        format,
        path: path.to_path_buf(),
        text: String::from_utf8_lossy(&bytes).into_owned(),
    }))
}

/// Loads the memory map of `pid`, preferring smaps and falling back to maps.
pub fn read_memory_map(proc_root: &Path, pid: u32) -> Result<MapSource> {
    let proc_path = proc_root.join(pid.to_string());
    let mut denied = false;

    for format in [MapFormat::Detailed, MapFormat::Minimal] {
        let path = proc_path.join(format.file_name());
        match attempt_source(&path, format)? {
            SourceAttempt::Loaded(source) => {
                debug!(
                    "Loaded {} ({} bytes) for pid {}",
                    source.path.display(),
                    source.text.len(),
                    pid
                );
                return Ok(source);
            }
            SourceAttempt::TryNext(e) => {
                debug!("Failed to open {}: {}", path.display(), e);
                denied |= e.kind() == io::ErrorKind::PermissionDenied;
            }
        }
    }

    Err(unavailable(pid, denied))
}

/// Error for a target none of whose sources could be opened.
fn unavailable(pid: u32, denied: bool) -> VmmapError {
    if denied {
        VmmapError::InsufficientPrivilege { pid }
    } else {
        VmmapError::ProcessUnavailable { pid }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMAPS_SAMPLE: &str = "\
00400000-00452000 r-xp 00000000 08:02 173521      /usr/bin/dbus-daemon
Size:                328 kB
KernelPageSize:        4 kB
Rss:                 300 kB
Private_Dirty:         0 kB
VmFlags: rd ex mr mw me dw
00651000-00652000 rw-p 00051000 08:02 173521      /usr/bin/dbus-daemon
Size:                  4 kB
Rss:                   4 kB
Shared_Dirty:          0 kB
Private_Dirty:         4 kB
VmFlags: rd wr mr mw me dw ac
7fff5e1b0000-7fff5e1d1000 rw-p 00000000 00:00 0                          [stack]
Size:                132 kB
";

    // -------------------------------------------------------------------------
    // Tests for parse_region_records
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_detailed_records() {
        let records = parse_region_records(SMAPS_SAMPLE);
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.start, 0x400000);
        assert_eq!(first.end, 0x452000);
        assert_eq!(first.permissions, "r-xp");
        assert_eq!(first.device, "08:02");
        assert_eq!(first.inode, 173521);
        assert_eq!(first.description, "/usr/bin/dbus-daemon");
        assert_eq!(first.attributes.get("Size").map(String::as_str), Some("328 kB"));
        assert_eq!(
            first.attributes.get("VmFlags").map(String::as_str),
            Some("rd ex mr mw me dw")
        );
        // Attributes never leak into the next record
        assert!(!first.attributes.contains_key("Shared_Dirty"));

        assert_eq!(records[1].offset, 0x51000);
        assert_eq!(records[2].description, "[stack]");
        assert_eq!(records[2].attributes.len(), 1);
    }

    #[test]
    fn test_parse_minimal_records() {
        let maps = "\
00400000-00401000 r-xp 00000000 08:01 12345 /bin/true
7ffd1000-7ffd2000 rw-p 00000000 00:00 0
";
        let records = parse_region_records(maps);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.attributes.is_empty()));
        assert_eq!(records[1].description, "");
        assert_eq!(records[1].inode, 0);
    }

    #[test]
    fn test_parse_ignores_orphan_and_unknown_lines() {
        let text = "\
Rss: 4 kB
this line means nothing
00400000-00401000 r--p 00000000 00:00 0 HEAP

Rss: 8 kB
";
        let records = parse_region_records(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attributes.len(), 1);
        assert_eq!(records[0].attributes.get("Rss").map(String::as_str), Some("8 kB"));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_region_records("").is_empty());
    }

    #[test]
    fn test_parse_inverted_range_drops_record_and_details() {
        let text = "\
00002000-00001000 rw-p 00000000 00:00 0
Size: 4 kB
00003000-00004000 rw-p 00000000 00:00 0
";
        let records = parse_region_records(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start, 0x3000);
        assert!(records[0].attributes.is_empty());
    }

    // -------------------------------------------------------------------------
    // Tests for source selection
    // -------------------------------------------------------------------------

    #[test]
    fn test_unavailable_distinguishes_denied() {
        assert!(matches!(
            unavailable(7, true),
            VmmapError::InsufficientPrivilege { pid: 7 }
        ));
        assert!(matches!(
            unavailable(7, false),
            VmmapError::ProcessUnavailable { pid: 7 }
        ));
    }

    #[test]
    fn test_read_memory_map_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("55");
        fs::create_dir_all(&dir).unwrap();
        for name in ["smaps", "maps"] {
            let path = dir.join(name);
            fs::write(&path, "00400000-00401000 r--p 00000000 00:00 0\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
        }

        // Root bypasses file modes
        if fs::File::open(dir.join("smaps")).is_ok() {
            return;
        }

        let err = read_memory_map(tmp.path(), 55).unwrap_err();
        assert!(matches!(err, VmmapError::InsufficientPrivilege { pid: 55 }));
    }

    #[test]
    fn test_attempt_source_accepts_non_utf8() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("maps");
        fs::write(&path, b"00400000-00401000 r--p 00000000 08:01 3 /opt/caf\xe9/lib.so\n").unwrap();

        let SourceAttempt::Loaded(source) = attempt_source(&path, MapFormat::Minimal).unwrap() else {
            panic!("source should load");
        };
        let records = parse_region_records(&source.text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "/opt/caf\u{FFFD}/lib.so");
    }

    // -------------------------------------------------------------------------
    // Tests for parse_attribute
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_attribute() {
        assert_eq!(parse_attribute("Rss:        4 kB"), Some(("Rss", "4 kB")));
        assert_eq!(parse_attribute("  THPeligible:    0"), Some(("THPeligible", "0")));
        assert_eq!(parse_attribute("VmFlags:"), Some(("VmFlags", "")));
        assert_eq!(parse_attribute("no colon here"), None);
        assert_eq!(parse_attribute(":value"), None);
    }
}
