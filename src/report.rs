//! Report assembly.
//!
//! [`VmmapReport`] bundles a classified entry set with everything the
//! renderers need: the writable / non-writable partition, the region type
//! and malloc zone summaries, and the read-only and writable totals.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::process::{classify_records, parse_region_records, read_memory_map, ClassifyContext};
use crate::region::RegionEntry;
use crate::summary::{
    summarize_by_type, summarize_malloc_zones, ReadOnlyLibraries, SummaryBucket, WritableRegions,
};

/// Display options accepted by the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Do not truncate the region detail column.
    pub wide: bool,
    /// Report sizes in pages instead of K/M/G.
    pub pages: bool,
    /// One region table in address order instead of non-writable then writable.
    pub interleaved: bool,
    /// Only print the summary, not individual regions.
    pub summary: bool,
    /// Do not merge adjacent identical regions in the region tables.
    pub no_coalesce: bool,
}

/// Which slice of the entry set a region table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionKind {
    NonWritable,
    Writable,
    Interleaved,
}

/// One region table.
#[derive(Debug, Clone, Serialize)]
pub struct RegionSection<'a> {
    pub kind: SectionKind,
    pub entries: Vec<&'a RegionEntry>,
}

/// One row of a summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub key: String,
    pub is_malloc: bool,
    #[serde(flatten)]
    pub bucket: SummaryBucket,
}

#[derive(Debug, Clone, Serialize)]
pub struct VmmapReport {
    pub options: ReportOptions,
    pub page_size: u64,
    pub entries: Vec<RegionEntry>,
    /// Region type summary, sorted by label.
    pub by_type: Vec<SummaryRow>,
    /// Malloc zone summary, sorted by zone name.
    pub malloc_zones: Vec<SummaryRow>,
    pub read_only_libraries: ReadOnlyLibraries,
    pub writable_regions: WritableRegions,
}

/// Reads, parses and classifies the memory map of `pid`.
pub fn inspect(proc_root: &Path, pid: u32, ctx: &ClassifyContext) -> Result<Vec<RegionEntry>> {
    let source = read_memory_map(proc_root, pid)?;
    let records = parse_region_records(&source.text);
    debug!(
        "Parsed {} regions from {:?} source for pid {}",
        records.len(),
        source.format,
        pid
    );
    classify_records(&records, ctx)
}

impl VmmapReport {
    /// Builds the report. The page size is taken from the entries, or from
    /// `host_page_size` when there are none.
    pub fn build(entries: Vec<RegionEntry>, options: ReportOptions, host_page_size: u64) -> Self {
        let page_size = entries.first().map_or(host_page_size, |e| e.page_size);

        // Both aggregations only read the entry set.
        let (types, zones) = rayon::join(
            || summarize_by_type(&entries),
            || summarize_malloc_zones(&entries),
        );

        let mut by_type: Vec<SummaryRow> = types
            .into_iter()
            .map(|(region_type, bucket)| SummaryRow {
                key: region_type.label().to_string(),
                is_malloc: region_type.is_malloc(),
                bucket,
            })
            .collect();
        by_type.sort_by(|a, b| a.key.cmp(&b.key));

        let mut malloc_zones: Vec<SummaryRow> = zones
            .into_iter()
            .map(|(zone, bucket)| SummaryRow {
                key: zone,
                is_malloc: true,
                bucket,
            })
            .collect();
        malloc_zones.sort_by(|a, b| a.key.cmp(&b.key));

        let read_only_libraries = ReadOnlyLibraries::from_entries(&entries);
        let writable_regions = WritableRegions::from_entries(&entries);

        Self {
            options,
            page_size,
            entries,
            by_type,
            malloc_zones,
            read_only_libraries,
            writable_regions,
        }
    }

    pub fn type_rows(&self) -> &[SummaryRow] {
        &self.by_type
    }

    pub fn zone_rows(&self) -> &[SummaryRow] {
        &self.malloc_zones
    }

    /// Region tables in display order: non-writable then writable, or a
    /// single interleaved table.
    pub fn sections(&self) -> Vec<RegionSection<'_>> {
        if self.options.interleaved {
            return vec![RegionSection {
                kind: SectionKind::Interleaved,
                entries: self.entries.iter().collect(),
            }];
        }

        let (writable, non_writable): (Vec<&RegionEntry>, Vec<&RegionEntry>) =
            self.entries.iter().partition(|e| e.is_writable());

        vec![
            RegionSection {
                kind: SectionKind::NonWritable,
                entries: non_writable,
            },
            RegionSection {
                kind: SectionKind::Writable,
                entries: writable,
            },
        ]
    }
}
