//! Herakles vmmap library
//!
//! Reports the virtual memory layout of a Linux process in the vmmap format,
//! built from `/proc/<pid>/smaps` or, when that is unavailable,
//! `/proc/<pid>/maps`.
//!
//! # Pipeline
//!
//! - **Parsing** ([`process::memory`]): source text to raw region records
//! - **Classification** ([`process::classifier`]): records to typed
//!   [`RegionEntry`] values, including the `__TEXT` / `__DATA` split
//! - **Aggregation** ([`summary`]): per region type and per malloc zone
//! - **Reporting** ([`report`], [`render`]): the assembled report and its
//!   text rendering
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_vmmap::{inspect, ClassifyContext, ReportOptions, VmmapReport};
//! use std::path::Path;
//!
//! let ctx = ClassifyContext::default();
//! let entries = inspect(Path::new("/proc"), std::process::id(), &ctx).unwrap();
//! let report = VmmapReport::build(entries, ReportOptions::default(), ctx.host_page_size);
//!
//! for row in report.type_rows() {
//!     println!("{}: {} bytes in {} regions", row.key, row.bucket.virtual_size, row.bucket.count);
//! }
//! ```

pub mod error;
pub mod process;
pub mod region;
pub mod render;
pub mod report;
pub mod summary;
pub mod system;
pub mod units;

// Re-export main types for convenience
pub use error::{Result, VmmapError};
pub use process::{ClassifyContext, ProcessInfo, RawRegionRecord};
pub use region::{Protection, RegionEntry, RegionType};
pub use report::{inspect, ReportOptions, VmmapReport};
pub use summary::{ReadOnlyLibraries, SummaryBucket, WritableRegions};
