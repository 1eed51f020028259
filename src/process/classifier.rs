//! Region classification into the vmmap taxonomy.
//!
//! Classification runs in two stages:
//! - [`classify_record`] turns one raw record into a [`RegionEntry`] using
//!   only that record's data.
//! - [`refine_mapped_files`] relabels file mappings as `__TEXT` / `__DATA`
//!   once the whole set is known, based on which backing files were ever
//!   mapped executable.

use ahash::AHashSet as HashSet;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, VmmapError};
use crate::process::memory::RawRegionRecord;
use crate::region::{Protection, RegionEntry, RegionType, SHARE_MODE_PLACEHOLDER};
use crate::units::{host_page_size, parse_size};

/// Prefix under which the host exposes the target's root filesystem.
pub const DEFAULT_ROOT_PREFIX: &str = "/Volumes/SystemRoot";

/// Heap markers, the first as written by the compatibility layer, the
/// second as written by Linux.
const HEAP_MARKERS: [&str; 2] = ["HEAP", "[heap]"];

const STACK_MARKER: &str = "[stack]";

static THREAD_STACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[stack:([0-9]+)\]$").expect("thread stack pattern is valid"));

/// Host facts the classifier needs, injected so classification stays a pure
/// function of its input.
#[derive(Debug, Clone)]
pub struct ClassifyContext {
    pub host_page_size: u64,
    pub root_prefix: String,
}

impl Default for ClassifyContext {
    fn default() -> Self {
        Self {
            host_page_size: host_page_size(),
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
        }
    }
}

/// Region type and detail text derived from a record's description.
fn classify_description(description: &str, root_prefix: &str) -> (RegionType, String) {
    if description.contains('/') {
        return (
            RegionType::MappedFile,
            format!("{}{}", root_prefix, description),
        );
    }
    if HEAP_MARKERS.contains(&description) {
        return (RegionType::Malloc, description.to_string());
    }
    if description == STACK_MARKER {
        return (RegionType::Stack, description.to_string());
    }
    if let Some(caps) = THREAD_STACK_RE.captures(description) {
        return (RegionType::Stack, format!("thread {}", &caps[1]));
    }
    (RegionType::VmAllocate, description.to_string())
}

/// Stage one: classify a single record.
///
/// Sizes prefer smaps attributes and fall back to address arithmetic.
pub fn classify_record(record: &RawRegionRecord, ctx: &ClassifyContext) -> Result<RegionEntry> {
    let attr = |name: &str| record.attributes.get(name).map(String::as_str);
    let size_of = |name: &str| attr(name).map(parse_size).transpose();

    let page_size = match size_of("KernelPageSize")? {
        Some(size) if size > 0 => size,
        _ => ctx.host_page_size,
    };
    let virtual_size = size_of("Size")?.unwrap_or(record.end - record.start);
    let resident_size = size_of("Rss")?.unwrap_or(virtual_size);
    let shared_dirty = size_of("Shared_Dirty")?.unwrap_or(0);
    let private_dirty = size_of("Private_Dirty")?.unwrap_or(0);
    let dirty_size = shared_dirty.checked_add(private_dirty).ok_or_else(|| {
        VmmapError::MalformedSize(format!(
            "Shared_Dirty {} + Private_Dirty {}",
            shared_dirty, private_dirty
        ))
    })?;
    let swap_size = size_of("Swap")?.unwrap_or(0);

    let protection = Protection::from_permissions(&record.permissions);
    let max_protection = attr("VmFlags").map(Protection::from_vm_flags);

    let (region_type, detail) = classify_description(&record.description, &ctx.root_prefix);

    Ok(RegionEntry {
        region_type,
        start_address: record.start,
        end_address: record.end,
        page_size,
        virtual_size,
        resident_size,
        dirty_size,
        swap_size,
        protection,
        max_protection,
        share_mode: SHARE_MODE_PLACEHOLDER.to_string(),
        purge_state: String::new(),
        detail,
    })
}

/// Backing paths that have at least one executable mapping.
pub fn executable_paths(entries: &[RegionEntry]) -> HashSet<String> {
    entries
        .iter()
        .filter(|e| e.region_type == RegionType::MappedFile && e.is_executable())
        .map(|e| e.detail.clone())
        .collect()
}

/// Stage two: split file mappings of executable files into `__TEXT` and
/// `__DATA`. Files never mapped executable stay `mapped file`.
pub fn refine_mapped_files(entries: Vec<RegionEntry>) -> Vec<RegionEntry> {
    let executables = executable_paths(&entries);

    entries
        .into_iter()
        .map(|mut entry| {
            if entry.region_type == RegionType::MappedFile && executables.contains(&entry.detail) {
                entry.region_type = if entry.is_executable() {
                    RegionType::Text
                } else {
                    RegionType::Data
                };
            }
            entry
        })
        .collect()
}

/// Runs both classification stages over a record set.
pub fn classify_records(
    records: &[RawRegionRecord],
    ctx: &ClassifyContext,
) -> Result<Vec<RegionEntry>> {
    let entries = records
        .iter()
        .map(|r| classify_record(r, ctx))
        .collect::<Result<Vec<_>>>()?;
    Ok(refine_mapped_files(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::memory::parse_region_records;

    fn ctx() -> ClassifyContext {
        ClassifyContext {
            host_page_size: 4096,
            root_prefix: String::new(),
        }
    }

    fn record(header: &str) -> RawRegionRecord {
        parse_region_records(header).remove(0)
    }

    // -------------------------------------------------------------------------
    // Tests for classify_record
    // -------------------------------------------------------------------------

    #[test]
    fn test_classify_minimal_mapped_file() {
        let r = record("00400000-00401000 r-xp 00000000 08:01 12345 /bin/true");
        let e = classify_record(&r, &ctx()).unwrap();

        assert_eq!(e.region_type, RegionType::MappedFile);
        assert_eq!(e.start_address, 0x400000);
        assert_eq!(e.end_address, 0x401000);
        assert_eq!(e.virtual_size, 4096);
        // No Rss attribute: residency falls back to the full virtual size
        assert_eq!(e.resident_size, 4096);
        assert_eq!(e.dirty_size, 0);
        assert_eq!(e.swap_size, 0);
        assert_eq!(e.page_size, 4096);
        assert_eq!(e.protection_pair(), "r-x/???");
        assert_eq!(e.share_mode, "NUL");
        assert_eq!(e.purge_state, "");
        assert_eq!(e.detail, "/bin/true");
    }

    #[test]
    fn test_classify_uses_attributes() {
        let text = "\
00400000-00500000 rw-p 00000000 00:00 0
Size:               1024 kB
KernelPageSize:       16 kB
Rss:                  64 kB
Shared_Dirty:          8 kB
Private_Dirty:        24 kB
Swap:                  4 kB
VmFlags: rd wr mr mw
";
        let e = classify_record(&record(text), &ctx()).unwrap();
        assert_eq!(e.page_size, 16 * 1024);
        assert_eq!(e.virtual_size, 1024 * 1024);
        assert_eq!(e.resident_size, 64 * 1024);
        assert_eq!(e.dirty_size, 32 * 1024);
        assert_eq!(e.swap_size, 4 * 1024);
        assert_eq!(e.protection_pair(), "rw-/rw-");
        assert_eq!(e.region_type, RegionType::VmAllocate);
    }

    #[test]
    fn test_classify_single_dirty_attribute() {
        let text = "\
00400000-00401000 rw-p 00000000 00:00 0
Private_Dirty:         4 kB
";
        let e = classify_record(&record(text), &ctx()).unwrap();
        assert_eq!(e.dirty_size, 4096);
    }

    #[test]
    fn test_classify_malformed_size() {
        let text = "\
00400000-00401000 rw-p 00000000 00:00 0
Size:                  4 xB
";
        let err = classify_record(&record(text), &ctx()).unwrap_err();
        assert!(matches!(err, VmmapError::MalformedSize(v) if v == "4 xB"));
    }

    #[test]
    fn test_classify_dirty_overflow_is_malformed() {
        let text = "\
00400000-00401000 rw-p 00000000 00:00 0
Shared_Dirty:   18014398509481983 kB
Private_Dirty:  18014398509481983 kB
";
        let err = classify_record(&record(text), &ctx()).unwrap_err();
        assert!(matches!(err, VmmapError::MalformedSize(_)));
    }

    #[test]
    fn test_classify_empty_vm_flags() {
        let text = "\
00400000-00401000 rw-p 00000000 00:00 0
VmFlags:
";
        let e = classify_record(&record(text), &ctx()).unwrap();
        assert_eq!(e.protection_pair(), "rw-/---");
    }

    #[test]
    fn test_classify_special_descriptions() {
        let cases = [
            ("HEAP", RegionType::Malloc, "HEAP"),
            ("[heap]", RegionType::Malloc, "[heap]"),
            ("[stack]", RegionType::Stack, "[stack]"),
            ("[stack:7]", RegionType::Stack, "thread 7"),
            ("[stack:x]", RegionType::VmAllocate, "[stack:x]"),
            ("[vdso]", RegionType::VmAllocate, "[vdso]"),
            ("", RegionType::VmAllocate, ""),
        ];

        for (description, expected_type, expected_detail) in cases {
            let header = format!("00400000-00401000 rw-p 00000000 00:00 0 {}", description);
            let e = classify_record(&record(&header), &ctx()).unwrap();
            assert_eq!(e.region_type, expected_type, "description {:?}", description);
            assert_eq!(e.detail, expected_detail, "description {:?}", description);
        }
    }

    #[test]
    fn test_classify_prefixes_backing_path() {
        let ctx = ClassifyContext {
            host_page_size: 4096,
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
        };
        let r = record("00400000-00401000 r--p 00000000 08:01 1 /usr/lib/libc.so.6");
        let e = classify_record(&r, &ctx).unwrap();
        assert_eq!(e.detail, "/Volumes/SystemRoot/usr/lib/libc.so.6");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let r = record("00400000-00401000 r-xp 00000000 08:01 12345 /bin/true");
        assert_eq!(
            classify_record(&r, &ctx()).unwrap(),
            classify_record(&r, &ctx()).unwrap()
        );
    }

    // -------------------------------------------------------------------------
    // Tests for refine_mapped_files
    // -------------------------------------------------------------------------

    #[test]
    fn test_refine_splits_text_and_data() {
        let text = "\
00400000-00401000 r-xp 00000000 08:01 1 /usr/lib/libfoo.so
00601000-00602000 rw-p 00001000 08:01 1 /usr/lib/libfoo.so
00700000-00701000 r--p 00000000 08:01 2 /usr/share/locale/archive
00800000-00801000 rw-p 00000000 00:00 0
";
        let entries = classify_records(&parse_region_records(text), &ctx()).unwrap();
        let types: Vec<_> = entries.iter().map(|e| e.region_type).collect();
        assert_eq!(
            types,
            vec![
                RegionType::Text,
                RegionType::Data,
                RegionType::MappedFile,
                RegionType::VmAllocate
            ]
        );
    }

    #[test]
    fn test_executable_paths_only_mapped_files() {
        let text = "\
00400000-00401000 r-xp 00000000 08:01 1 /bin/true
00500000-00501000 rwxp 00000000 00:00 0 [anon]
";
        let stage_one: Vec<_> = parse_region_records(text)
            .iter()
            .map(|r| classify_record(r, &ctx()).unwrap())
            .collect();
        let paths = executable_paths(&stage_one);
        assert_eq!(paths.len(), 1);
        assert!(paths.contains("/bin/true"));
    }
}
