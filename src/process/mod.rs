//! Process-related modules for memory map inspection.
//!
//! This module provides:
//! - `memory`: Memory map parsing from /proc/<pid>/smaps and /proc/<pid>/maps
//! - `classifier`: Region classification into the vmmap taxonomy
//! - `info`: Process metadata for the report overview

pub mod classifier;
pub mod info;
pub mod memory;

// Re-export commonly used types
pub use classifier::{
    classify_record, classify_records, executable_paths, refine_mapped_files, ClassifyContext,
    DEFAULT_ROOT_PREFIX,
};
pub use info::{check_target, load_address, read_process_info, ProcessInfo};
pub use memory::{
    parse_region_records, read_memory_map, MapFormat, MapSource, RawRegionRecord, SourceAttempt,
};
