//! Integration tests for reading, parsing and classifying memory maps from a
//! fake /proc tree.

use std::fs;
use std::path::Path;

use herakles_vmmap::process::{parse_region_records, read_memory_map, MapFormat};
use herakles_vmmap::{inspect, ClassifyContext, RegionType, VmmapError};

const SMAPS: &str = "\
00400000-00401000 r-xp 00000000 08:01 12345 /bin/true
Size:                  4 kB
KernelPageSize:        4 kB
Rss:                   4 kB
Shared_Dirty:          0 kB
Private_Dirty:         0 kB
Swap:                  0 kB
VmFlags: rd ex mr mw me
00600000-00601000 rw-p 00000000 08:01 12345 /bin/true
Size:                  4 kB
Rss:                   4 kB
Private_Dirty:         4 kB
VmFlags: rd wr mr mw me
01000000-01100000 rw-p 00000000 00:00 0 [heap]
Size:                  1 MB
Rss:                 128 kB
Private_Dirty:       128 kB
Swap:                 64 kB
7ffc0000-7ffc1000 rw-p 00000000 00:00 0 [stack:7]
Size:                  4 kB
";

const MAPS: &str = "\
00400000-00401000 r-xp 00000000 08:01 12345 /bin/true
7ffd0000-7ffd1000 rw-p 00000000 00:00 0 [stack]
";

fn ctx() -> ClassifyContext {
    ClassifyContext {
        host_page_size: 4096,
        root_prefix: String::new(),
    }
}

fn fake_process(root: &Path, pid: u32, smaps: Option<&str>, maps: Option<&str>) {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir).unwrap();
    if let Some(text) = smaps {
        fs::write(dir.join("smaps"), text).unwrap();
    }
    if let Some(text) = maps {
        fs::write(dir.join("maps"), text).unwrap();
    }
}

// -------------------------------------------------------------------------
// Tests for source selection
// -------------------------------------------------------------------------

#[test]
fn test_prefers_detailed_source() {
    let tmp = tempfile::tempdir().unwrap();
    fake_process(tmp.path(), 100, Some(SMAPS), Some(MAPS));

    let source = read_memory_map(tmp.path(), 100).unwrap();
    assert_eq!(source.format, MapFormat::Detailed);
    assert!(source.path.ends_with("100/smaps"));
}

#[test]
fn test_falls_back_to_minimal_source() {
    let tmp = tempfile::tempdir().unwrap();
    fake_process(tmp.path(), 101, None, Some(MAPS));

    let source = read_memory_map(tmp.path(), 101).unwrap();
    assert_eq!(source.format, MapFormat::Minimal);

    let entries = inspect(tmp.path(), 101, &ctx()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].region_type, RegionType::Text);
    // Minimal source has no residency data: falls back to the virtual size
    assert_eq!(entries[0].resident_size, entries[0].virtual_size);
    assert_eq!(entries[1].region_type, RegionType::Stack);
}

#[test]
fn test_missing_process_is_unavailable() {
    let tmp = tempfile::tempdir().unwrap();
    let err = inspect(tmp.path(), 4242, &ctx()).unwrap_err();
    assert!(matches!(err, VmmapError::ProcessUnavailable { pid: 4242 }));
    assert_eq!(
        err.to_string(),
        "vmmap cannot examine process 4242 because it no longer appears to be running."
    );
}

#[test]
fn test_empty_source_yields_no_entries() {
    let tmp = tempfile::tempdir().unwrap();
    fake_process(tmp.path(), 102, Some(""), None);
    assert!(inspect(tmp.path(), 102, &ctx()).unwrap().is_empty());
}

#[test]
fn test_malformed_size_aborts_request() {
    let tmp = tempfile::tempdir().unwrap();
    fake_process(
        tmp.path(),
        103,
        Some("00400000-00401000 rw-p 00000000 00:00 0\nSize: 4 xB\n"),
        Some(MAPS),
    );
    let err = inspect(tmp.path(), 103, &ctx()).unwrap_err();
    assert!(matches!(err, VmmapError::MalformedSize(_)));
    assert_eq!(err.to_string(), "Failed to parse size: 4 xB");
}

// -------------------------------------------------------------------------
// Tests for the parsed entry set
// -------------------------------------------------------------------------

#[test]
fn test_one_entry_per_header() {
    let headers = SMAPS.lines().filter(|l| l.contains(" 08:01 ") || l.contains(" 00:00 ")).count();
    assert_eq!(parse_region_records(SMAPS).len(), headers);

    let tmp = tempfile::tempdir().unwrap();
    fake_process(tmp.path(), 104, Some(SMAPS), None);
    let entries = inspect(tmp.path(), 104, &ctx()).unwrap();
    assert_eq!(entries.len(), headers);

    for entry in &entries {
        assert!(entry.start_address < entry.end_address);
        assert!(entry.page_size > 0);
    }
}

#[test]
fn test_detailed_entries() {
    let tmp = tempfile::tempdir().unwrap();
    fake_process(tmp.path(), 105, Some(SMAPS), None);
    let entries = inspect(tmp.path(), 105, &ctx()).unwrap();

    let text = &entries[0];
    assert_eq!(text.region_type, RegionType::Text);
    assert_eq!(text.protection_pair(), "r-x/rwx");

    let data = &entries[1];
    assert_eq!(data.region_type, RegionType::Data);
    assert_eq!(data.dirty_size, 4096);

    let heap = &entries[2];
    assert_eq!(heap.region_type, RegionType::Malloc);
    assert_eq!(heap.virtual_size, 1_048_576);
    assert_eq!(heap.resident_size, 128 * 1024);
    assert_eq!(heap.swap_size, 64 * 1024);

    let stack = &entries[3];
    assert_eq!(stack.region_type, RegionType::Stack);
    assert!(stack.detail.contains('7'));
}

#[test]
fn test_classification_is_repeatable() {
    let tmp = tempfile::tempdir().unwrap();
    fake_process(tmp.path(), 106, Some(SMAPS), None);
    let first = inspect(tmp.path(), 106, &ctx()).unwrap();
    let second = inspect(tmp.path(), 106, &ctx()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_root_prefix_applied_to_backing_paths() {
    let tmp = tempfile::tempdir().unwrap();
    fake_process(tmp.path(), 107, None, Some(MAPS));
    let ctx = ClassifyContext {
        host_page_size: 4096,
        root_prefix: "/Volumes/SystemRoot".to_string(),
    };
    let entries = inspect(tmp.path(), 107, &ctx).unwrap();
    assert_eq!(entries[0].detail, "/Volumes/SystemRoot/bin/true");
    assert_eq!(entries[0].region_type, RegionType::Text);
}

#[test]
fn test_non_utf8_backing_path_is_kept() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("108");
    fs::create_dir_all(&dir).unwrap();
    let mut smaps = b"00400000-00401000 r-xp 00000000 08:01 9 /opt/caf\xe9/lib.so\nSize: 4 kB\n".to_vec();
    smaps.extend_from_slice(b"7ffc0000-7ffc1000 rw-p 00000000 00:00 0 [stack]\nSize: 4 kB\n");
    fs::write(dir.join("smaps"), smaps).unwrap();

    let entries = inspect(tmp.path(), 108, &ctx()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].region_type, RegionType::Text);
    assert_eq!(entries[0].detail, "/opt/caf\u{FFFD}/lib.so");
    assert_eq!(entries[1].region_type, RegionType::Stack);
}
