//! Normalized memory region model.
//!
//! A [`RegionEntry`] is one contiguous range of the target's address space,
//! expressed in the vmmap taxonomy. Entries are produced once per inspection
//! and never mutated afterwards.

use serde::{Serialize, Serializer};
use std::fmt;

/// Marker printed for permissions that cannot be derived from the source.
pub const UNKNOWN_PROTECTION: &str = "???";

/// Share mode reported for every region; Linux maps carry no equivalent.
pub const SHARE_MODE_PLACEHOLDER: &str = "NUL";

/// Semantic region type, mirroring the vmmap REGION TYPE column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionType {
    VmAllocate,
    MappedFile,
    Text,
    Data,
    Malloc,
    Stack,
}

impl RegionType {
    pub fn label(&self) -> &'static str {
        match self {
            RegionType::VmAllocate => "VM_ALLOCATE",
            RegionType::MappedFile => "mapped file",
            RegionType::Text => "__TEXT",
            RegionType::Data => "__DATA",
            RegionType::Malloc => "MALLOC",
            RegionType::Stack => "Stack",
        }
    }

    /// Allocator regions get their own zone table.
    pub fn is_malloc(&self) -> bool {
        matches!(self, RegionType::Malloc)
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RegionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Read/write/execute triple of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Protection {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Protection {
    pub const NONE: Protection = Protection {
        read: false,
        write: false,
        execute: false,
    };

    /// Reads the first three slots of a maps permission field (`r-xp`).
    /// An empty field yields `None`.
    pub fn from_permissions(perms: &str) -> Option<Protection> {
        if perms.is_empty() {
            return None;
        }
        let slots: Vec<char> = perms.chars().take(3).collect();
        Some(Protection {
            read: slots.first() == Some(&'r'),
            write: slots.get(1) == Some(&'w'),
            execute: slots.get(2) == Some(&'x'),
        })
    }

    /// Maximum protection from the `VmFlags` token set (`mr`, `mw`, `me`).
    pub fn from_vm_flags(flags: &str) -> Protection {
        let mut max = Protection::NONE;
        for token in flags.split_whitespace() {
            match token {
                "mr" => max.read = true,
                "mw" => max.write = true,
                "me" => max.execute = true,
                _ => {}
            }
        }
        max
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' }
        )
    }
}

impl Serialize for Protection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Renders an optional protection, using the unknown marker for `None`.
pub fn protection_label(protection: Option<Protection>) -> String {
    match protection {
        Some(p) => p.to_string(),
        None => UNKNOWN_PROTECTION.to_string(),
    }
}

/// One normalized memory region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionEntry {
    pub region_type: RegionType,
    pub start_address: u64,
    pub end_address: u64,
    pub page_size: u64,
    pub virtual_size: u64,
    /// Falls back to `virtual_size` when the source has no `Rss`, which
    /// overstates residency for untouched regions.
    pub resident_size: u64,
    pub dirty_size: u64,
    pub swap_size: u64,
    pub protection: Option<Protection>,
    pub max_protection: Option<Protection>,
    pub share_mode: String,
    /// One of `V`, `N`, `E` or empty.
    pub purge_state: String,
    pub detail: String,
}

impl RegionEntry {
    /// Unknown protections count as non-writable.
    pub fn is_writable(&self) -> bool {
        self.protection.is_some_and(|p| p.write)
    }

    pub fn is_executable(&self) -> bool {
        self.protection.is_some_and(|p| p.execute)
    }

    /// `PRT/MAX` column text, e.g. `r-x/rwx`.
    pub fn protection_pair(&self) -> String {
        format!(
            "{}/{}",
            protection_label(self.protection),
            protection_label(self.max_protection)
        )
    }
}
