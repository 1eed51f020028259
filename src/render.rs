//! Text rendering of a [`VmmapReport`] in the vmmap layout.
//!
//! Everything here is presentation: column widths, truncation, coalescing of
//! adjacent identical rows and the `???` placeholders for values Linux does
//! not expose.

use chrono::{DateTime, Local};
use std::io::{self, Write};

use crate::process::{load_address, ProcessInfo};
use crate::region::RegionEntry;
use crate::report::{RegionSection, SectionKind, SummaryRow, VmmapReport};
use crate::system::OsVersionSource;
use crate::units::{format_data, pages_or_size, percent};

const UNKNOWN: &str = "???";
const OVERVIEW_LABEL_WIDTH: usize = 30;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

// Region table columns
const REGION_TYPE_WIDTH: usize = 24;
const START_ADDRESS_WIDTH: usize = 12;
const END_ADDRESS_WIDTH: usize = 12;
const VSIZE_WIDTH: usize = 6;
const RSDNT_WIDTH: usize = 7;
const DIRTY_WIDTH: usize = 7;
const SWAP_WIDTH: usize = 7;
const PRTMAX_WIDTH: usize = 7;
const SHRMOD_WIDTH: usize = 6;
const PURGE_WIDTH: usize = 8;

/// Width of every region table column before REGION DETAIL, separators included.
pub const REGION_TABLE_FIXED_WIDTH: usize = REGION_TYPE_WIDTH
    + 1
    + START_ADDRESS_WIDTH
    + 1
    + END_ADDRESS_WIDTH
    + 1
    + 1
    + VSIZE_WIDTH
    + RSDNT_WIDTH
    + DIRTY_WIDTH
    + SWAP_WIDTH
    + 1
    + 1
    + PRTMAX_WIDTH
    + 1
    + SHRMOD_WIDTH
    + 1
    + PURGE_WIDTH
    + 1;

// Summary table columns
const SUMMARY_TYPE_WIDTH: usize = 30;
const SUMMARY_SIZE_WIDTH: usize = 8;
const SUMMARY_COUNT_WIDTH: usize = 7;

// Malloc zone table columns
const ZONE_NAME_WIDTH: usize = 29;
const ZONE_SIZE_WIDTH: usize = 10;
const ZONE_FRAG_WIDTH: usize = 7;
const ZONE_COUNT_WIDTH: usize = 7;

/// Everything the overview needs besides the report itself.
pub struct RenderContext<'a> {
    pub process: &'a ProcessInfo,
    pub os_version: &'a dyn OsVersionSource,
    pub tool_path: String,
    pub tool_version: String,
    /// Maximum REGION DETAIL width; `None` prints details in full.
    pub detail_width: Option<usize>,
    pub now: DateTime<Local>,
}

/// Space left for REGION DETAIL on a terminal `columns` wide.
pub fn detail_width_for_columns(columns: usize) -> usize {
    columns.saturating_sub(REGION_TABLE_FIXED_WIDTH)
}

/// Keeps the end of `s`, replacing the cut-off start with `...`.
pub fn truncate_prefix(s: &str, max_len: usize) -> String {
    if max_len < 3 {
        return ".".repeat(max_len);
    }
    let len = s.chars().count();
    if len <= max_len {
        return s.to_string();
    }
    let tail: String = s.chars().skip(len - (max_len - 3)).collect();
    format!("...{}", tail)
}

/// Keeps the start of `s`, replacing the cut-off end with `...`.
pub fn truncate_suffix(s: &str, max_len: usize) -> String {
    if max_len < 3 {
        return ".".repeat(max_len);
    }
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{}...", head)
}

fn mergeable(prev: &RegionEntry, next: &RegionEntry) -> bool {
    prev.end_address == next.start_address
        && prev.region_type == next.region_type
        && prev.detail == next.detail
        && prev.protection == next.protection
        && prev.max_protection == next.max_protection
        && prev.share_mode == next.share_mode
        && prev.purge_state == next.purge_state
}

/// Merges runs of address-adjacent regions that would print identically
/// apart from their sizes.
pub fn coalesce(entries: &[&RegionEntry]) -> Vec<RegionEntry> {
    let mut out: Vec<RegionEntry> = Vec::with_capacity(entries.len());
    for &entry in entries {
        match out.last_mut() {
            Some(prev) if mergeable(prev, entry) => {
                prev.end_address = entry.end_address;
                prev.virtual_size = prev.virtual_size.saturating_add(entry.virtual_size);
                prev.resident_size = prev.resident_size.saturating_add(entry.resident_size);
                prev.dirty_size = prev.dirty_size.saturating_add(entry.dirty_size);
                prev.swap_size = prev.swap_size.saturating_add(entry.swap_size);
            }
            _ => out.push(entry.clone()),
        }
    }
    out
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or(UNKNOWN)
}

fn overview_line<W: Write>(out: &mut W, label: &str, value: &str) -> io::Result<()> {
    writeln!(out, "{:<width$}{}", label, value, width = OVERVIEW_LABEL_WIDTH)
}

/// Header block with process, host and tool information.
pub fn write_overview<W: Write>(
    out: &mut W,
    report: &VmmapReport,
    ctx: &RenderContext<'_>,
) -> io::Result<()> {
    let process = ctx.process;
    let name = or_unknown(process.name.as_deref());

    let load = process
        .path
        .as_deref()
        .and_then(|path| load_address(&report.entries, path))
        .map(|addr| format!("{:x}", addr))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let parent = match process.parent_pid {
        Some(ppid) => format!(
            "{} [{}]",
            or_unknown(process.parent_name.as_deref()),
            ppid
        ),
        None => UNKNOWN.to_string(),
    };

    let launch = process
        .start_time
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    overview_line(out, "Process:", &format!("{} [{}]", name, process.pid))?;
    overview_line(out, "Path:", or_unknown(process.path.as_deref()))?;
    overview_line(out, "Load Address:", &load)?;
    overview_line(out, "Identifier:", name)?;
    overview_line(out, "Version:", UNKNOWN)?;
    overview_line(out, "Code Type:", UNKNOWN)?;
    overview_line(out, "Parent Process:", &parent)?;
    writeln!(out)?;

    overview_line(out, "Date/Time:", &ctx.now.format(TIME_FORMAT).to_string())?;
    overview_line(out, "Launch Time:", &launch)?;
    overview_line(out, "OS Version:", &ctx.os_version.os_version())?;
    overview_line(out, "Report Version:", "0")?;
    overview_line(out, "Analysis Tool:", &ctx.tool_path)?;
    overview_line(out, "Analysis Tool Version:", &ctx.tool_version)?;
    writeln!(out)?;

    overview_line(out, "Physical footprint:", UNKNOWN)?;
    overview_line(out, "Physical footprint (peak):", UNKNOWN)?;
    writeln!(out, "----")?;
    writeln!(out)
}

/// One region table with its header.
pub fn write_region_table<W: Write>(
    out: &mut W,
    entries: &[RegionEntry],
    pages: bool,
    detail_width: Option<usize>,
) -> io::Result<()> {
    writeln!(
        out,
        "{:<tw$} {:>sw$}-{:<ew$} [{:>vw$}{:>rw$}{:>dw$}{:>ww$}] {:<pw$} {:<mw$} {:<gw$} REGION DETAIL",
        "REGION TYPE",
        "START ",
        " END",
        "VSIZE",
        "RSDNT",
        "DIRTY",
        "SWAP",
        "PRT/MAX",
        "SHRMOD",
        "PURGE",
        tw = REGION_TYPE_WIDTH,
        sw = START_ADDRESS_WIDTH,
        ew = END_ADDRESS_WIDTH,
        vw = VSIZE_WIDTH,
        rw = RSDNT_WIDTH,
        dw = DIRTY_WIDTH,
        ww = SWAP_WIDTH,
        pw = PRTMAX_WIDTH,
        mw = SHRMOD_WIDTH,
        gw = PURGE_WIDTH,
    )?;

    for entry in entries {
        let size = |bytes: u64| pages_or_size(bytes, entry.page_size, pages);
        let detail = match detail_width {
            Some(width) => truncate_prefix(&entry.detail, width),
            None => entry.detail.clone(),
        };

        writeln!(
            out,
            "{:<tw$} {:>sw$x}-{:<ew$x} [{:>vw$}{:>rw$}{:>dw$}{:>ww$}] {:<pw$} {:<mw$} {:<gw$} {}",
            entry.region_type.label(),
            entry.start_address,
            entry.end_address,
            size(entry.virtual_size),
            size(entry.resident_size),
            size(entry.dirty_size),
            size(entry.swap_size),
            entry.protection_pair(),
            entry.share_mode,
            entry.purge_state,
            detail,
            tw = REGION_TYPE_WIDTH,
            sw = START_ADDRESS_WIDTH,
            ew = END_ADDRESS_WIDTH,
            vw = VSIZE_WIDTH,
            rw = RSDNT_WIDTH,
            dw = DIRTY_WIDTH,
            ww = SWAP_WIDTH,
            pw = PRTMAX_WIDTH,
            mw = SHRMOD_WIDTH,
            gw = PURGE_WIDTH,
        )?;
    }
    Ok(())
}

fn section_title(kind: SectionKind, pid: u32) -> String {
    match kind {
        SectionKind::NonWritable => format!("==== Non-writable regions for process {}", pid),
        SectionKind::Writable => format!("==== Writable regions for process {}", pid),
        SectionKind::Interleaved => format!(
            "==== regions for process {}  (non-writable and writable regions are interleaved)",
            pid
        ),
    }
}

fn write_section<W: Write>(
    out: &mut W,
    section: &RegionSection<'_>,
    report: &VmmapReport,
    pid: u32,
    detail_width: Option<usize>,
) -> io::Result<()> {
    writeln!(out, "{}", section_title(section.kind, pid))?;
    let rows: Vec<RegionEntry> = if report.options.no_coalesce {
        section.entries.iter().map(|&e| e.clone()).collect()
    } else {
        coalesce(&section.entries)
    };
    write_region_table(out, &rows, report.options.pages, detail_width)?;
    writeln!(out)
}

/// Sharing mode and purge state legend.
pub fn write_legend<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "==== Legend")?;
    writeln!(out, "SM=sharing mode:")?;
    writeln!(out, "\t\tCOW=copy_on_write PRV=private NUL=empty ALI=aliased")?;
    writeln!(out, "\t\tSHM=shared ZER=zero_filled S/A=shared_alias")?;
    writeln!(out, "PURGE=purgeable mode:")?;
    writeln!(out, "\t\tV=volatile N=nonvolatile E=empty   otherwise is unpurgeable")?;
    writeln!(out)
}

/// Read-only and writable totals followed by the region type table.
pub fn write_summary<W: Write>(out: &mut W, report: &VmmapReport, pid: u32) -> io::Result<()> {
    let ro = &report.read_only_libraries;
    let rw = &report.writable_regions;

    writeln!(out, "==== Summary for process {}", pid)?;
    writeln!(
        out,
        "ReadOnly portion of Libraries: Total={} resident={}({}) swapped_out_or_unallocated={}({})",
        format_data(ro.total, ""),
        format_data(ro.resident, ""),
        percent(ro.resident, ro.total),
        format_data(ro.swapped_out_or_unallocated(), ""),
        percent(ro.swapped_out_or_unallocated(), ro.total),
    )?;
    writeln!(
        out,
        "Writable regions: Total={} written={}({}) resident={}({}) swapped_out={}({}) unallocated={}({})",
        format_data(rw.total, ""),
        format_data(rw.dirty, ""),
        percent(rw.dirty, rw.total),
        format_data(rw.resident, ""),
        percent(rw.resident, rw.total),
        format_data(rw.swapped, ""),
        percent(rw.swapped, rw.total),
        format_data(rw.unallocated(), ""),
        percent(rw.unallocated(), rw.total),
    )?;
    writeln!(out)?;

    let unit = if report.options.pages { "PAGES" } else { "SIZE" };
    let (tw, sw, cw) = (SUMMARY_TYPE_WIDTH, SUMMARY_SIZE_WIDTH, SUMMARY_COUNT_WIDTH);

    writeln!(
        out,
        "{:<tw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>cw$}",
        "", "VIRTUAL", "RESIDENT", "DIRTY", "SWAPPED", "VOLATILE", "NONVOL", "EMPTY", "REGION"
    )?;
    writeln!(
        out,
        "{:<tw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>cw$} (non-coalesced)",
        "REGION TYPE", unit, unit, unit, unit, unit, unit, unit, "COUNT"
    )?;
    writeln!(
        out,
        "{:<tw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>cw$}",
        "===========", "=======", "=======", "=====", "=======", "========", "======", "=====",
        "======="
    )?;

    for row in report.type_rows() {
        write_summary_row(out, row, report)?;
    }
    writeln!(out)
}

fn write_summary_row<W: Write>(out: &mut W, row: &SummaryRow, report: &VmmapReport) -> io::Result<()> {
    let size = |bytes: u64| pages_or_size(bytes, report.page_size, report.options.pages);
    let b = &row.bucket;
    let (tw, sw, cw) = (SUMMARY_TYPE_WIDTH, SUMMARY_SIZE_WIDTH, SUMMARY_COUNT_WIDTH);

    write!(
        out,
        "{:<tw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>cw$} ",
        truncate_suffix(&row.key, SUMMARY_TYPE_WIDTH),
        size(b.virtual_size),
        size(b.resident_size),
        size(b.dirty_size),
        size(b.swap_size),
        size(b.volatile_size),
        size(b.non_volatile_size),
        size(b.empty_size),
        b.count,
    )?;
    if row.is_malloc {
        write!(out, "see MALLOC ZONE table below")?;
    }
    writeln!(out)
}

/// Malloc zone table. Allocation statistics are not available from procfs.
pub fn write_malloc_zones<W: Write>(out: &mut W, report: &VmmapReport) -> io::Result<()> {
    let unit = if report.options.pages { "PAGES" } else { "SIZE" };
    let (nw, sw, fw, cw) = (ZONE_NAME_WIDTH, ZONE_SIZE_WIDTH, ZONE_FRAG_WIDTH, ZONE_COUNT_WIDTH);

    writeln!(
        out,
        "{:<nw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>fw$} {:>cw$}",
        "", "VIRTUAL", "RESIDENT", "DIRTY", "SWAPPED", "ALLOCATION", "BYTES", "DIRTY+SWAP", "",
        "REGION"
    )?;
    writeln!(
        out,
        "{:<nw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>fw$} {:>cw$} ",
        "MALLOC ZONE", unit, unit, unit, unit, "COUNT", "ALLOCATED", "FRAG SIZE", "% FRAG",
        "COUNT"
    )?;
    writeln!(
        out,
        "{:<nw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>fw$} {:>cw$}",
        "===========", "=======", "=========", "=========", "=========", "=========",
        "=========", "=========", "======", "======"
    )?;

    for zone in report.zone_rows() {
        let size = |bytes: u64| pages_or_size(bytes, report.page_size, report.options.pages);
        let b = &zone.bucket;
        writeln!(
            out,
            "{:<nw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>sw$} {:>fw$} {:>cw$} ",
            truncate_suffix(&zone.key, ZONE_NAME_WIDTH),
            size(b.virtual_size),
            size(b.resident_size),
            size(b.dirty_size),
            size(b.swap_size),
            UNKNOWN,
            UNKNOWN,
            UNKNOWN,
            "??%",
            b.count,
        )?;
    }
    writeln!(out)
}

/// Full text report: overview, region tables (unless summary-only), legend,
/// summary and malloc zones.
pub fn render_text<W: Write>(
    out: &mut W,
    report: &VmmapReport,
    ctx: &RenderContext<'_>,
) -> io::Result<()> {
    let pid = ctx.process.pid;
    let detail_width = if report.options.wide {
        None
    } else {
        ctx.detail_width
    };

    write_overview(out, report, ctx)?;

    if !report.options.summary {
        writeln!(
            out,
            "Virtual Memory Map of process {} ({})",
            pid,
            or_unknown(ctx.process.name.as_deref())
        )?;
        writeln!(out, "Output report format: 0.0")?;
        writeln!(out, "VM page size: {} bytes", report.page_size)?;
        writeln!(out)?;

        for section in report.sections() {
            write_section(out, &section, report, pid, detail_width)?;
        }

        write_legend(out)?;
    }

    write_summary(out, report, pid)?;
    write_malloc_zones(out, report)
}
