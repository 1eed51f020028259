//! Aggregation of region entries into summary buckets.
//!
//! Buckets are keyed by region type for the whole-process summary and by
//! zone name for the malloc zone table. Accumulation is a plain sum, so the
//! order entries arrive in never changes a total.

use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::hash::Hash;

use crate::region::{RegionEntry, RegionType};

/// Running sums for one summary key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryBucket {
    pub virtual_size: u64,
    pub resident_size: u64,
    pub dirty_size: u64,
    pub swap_size: u64,
    pub volatile_size: u64,
    pub non_volatile_size: u64,
    pub empty_size: u64,
    pub count: usize,
}

impl SummaryBucket {
    /// Folds one entry into the bucket. Purge sub-totals take the virtual
    /// size of entries in the matching purge state.
    pub fn add(&mut self, entry: &RegionEntry) {
        self.virtual_size = self.virtual_size.saturating_add(entry.virtual_size);
        self.resident_size = self.resident_size.saturating_add(entry.resident_size);
        self.dirty_size = self.dirty_size.saturating_add(entry.dirty_size);
        self.swap_size = self.swap_size.saturating_add(entry.swap_size);

        let purge_total = match entry.purge_state.as_str() {
            "V" => Some(&mut self.volatile_size),
            "N" => Some(&mut self.non_volatile_size),
            "E" => Some(&mut self.empty_size),
            _ => None,
        };
        if let Some(total) = purge_total {
            *total = total.saturating_add(entry.virtual_size);
        }

        self.count += 1;
    }
}

/// Groups entries by `key_fn`; entries mapped to `None` are left out.
pub fn aggregate<'a, K, I, F>(entries: I, key_fn: F) -> HashMap<K, SummaryBucket>
where
    K: Eq + Hash,
    I: IntoIterator<Item = &'a RegionEntry>,
    F: Fn(&RegionEntry) -> Option<K>,
{
    let mut buckets: HashMap<K, SummaryBucket> = HashMap::new();
    for entry in entries {
        if let Some(key) = key_fn(entry) {
            buckets.entry(key).or_default().add(entry);
        }
    }
    buckets
}

/// Sums every entry into a single bucket.
pub fn totals<'a, I>(entries: I) -> SummaryBucket
where
    I: IntoIterator<Item = &'a RegionEntry>,
{
    let mut bucket = SummaryBucket::default();
    for entry in entries {
        bucket.add(entry);
    }
    bucket
}

/// Whole-process summary keyed by region type.
pub fn summarize_by_type(entries: &[RegionEntry]) -> HashMap<RegionType, SummaryBucket> {
    aggregate(entries, |e| Some(e.region_type))
}

/// Malloc zone summary keyed by the zone named in the region detail.
pub fn summarize_malloc_zones(entries: &[RegionEntry]) -> HashMap<String, SummaryBucket> {
    aggregate(entries, |e| {
        if e.region_type.is_malloc() {
            Some(e.detail.clone())
        } else {
            None
        }
    })
}

/// "ReadOnly portion of Libraries": non-writable `__TEXT` regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadOnlyLibraries {
    pub total: u64,
    pub resident: u64,
}

impl ReadOnlyLibraries {
    pub fn from_entries(entries: &[RegionEntry]) -> Self {
        let bucket = totals(
            entries
                .iter()
                .filter(|e| !e.is_writable() && e.region_type == RegionType::Text),
        );
        Self {
            total: bucket.virtual_size,
            resident: bucket.resident_size,
        }
    }

    pub fn swapped_out_or_unallocated(&self) -> u64 {
        self.total.saturating_sub(self.resident)
    }
}

/// "Writable regions" totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WritableRegions {
    pub total: u64,
    /// Reported as "written".
    pub dirty: u64,
    pub resident: u64,
    pub swapped: u64,
}

impl WritableRegions {
    pub fn from_entries(entries: &[RegionEntry]) -> Self {
        let bucket = totals(entries.iter().filter(|e| e.is_writable()));
        Self {
            total: bucket.virtual_size,
            dirty: bucket.dirty_size,
            resident: bucket.resident_size,
            swapped: bucket.swap_size,
        }
    }

    pub fn unallocated(&self) -> u64 {
        self.total
            .saturating_sub(self.resident)
            .saturating_sub(self.swapped)
    }
}
