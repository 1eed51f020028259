//! Size and unit helpers.
//!
//! Converts smaps size attributes into byte counts and byte counts into the
//! page counts or K/M/G strings shown in reports.

use once_cell::sync::Lazy;

use crate::error::{Result, VmmapError};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// Query the native page size of the host.
fn get_page_size() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_PAGESIZE
        // Returns -1 on error - handled by the > 0 check
        unsafe {
            let size = libc::sysconf(libc::_SC_PAGESIZE);
            if size > 0 {
                return size as u64;
            }
        }
    }
    4096
}

/// Native page size of the host, used when a region carries no `KernelPageSize`.
pub static HOST_PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

pub fn host_page_size() -> u64 {
    *HOST_PAGE_SIZE
}

/// Parses an smaps size value such as `4 kB` into bytes.
///
/// Only `kB`, `MB` and `GB` are accepted; anything else is a
/// [`VmmapError::MalformedSize`].
pub fn parse_size(value: &str) -> Result<u64> {
    let malformed = || VmmapError::MalformedSize(value.to_string());

    let mut parts = value.split_whitespace();
    let number: u64 = parts
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(malformed)?;

    let multiplier = match parts.next() {
        Some("kB") => KIB,
        Some("MB") => MIB,
        Some("GB") => GIB,
        _ => return Err(malformed()),
    };

    if parts.next().is_some() {
        return Err(malformed());
    }

    number.checked_mul(multiplier).ok_or_else(malformed)
}

/// Formats a byte count as whole K, M or G.
///
/// Kilobytes are kept up to 9999K before switching to megabytes.
pub fn format_data(bytes: u64, sep: &str) -> String {
    if bytes < 9999 * KIB {
        format!("{}{}K", bytes / KIB, sep)
    } else if bytes < GIB {
        format!("{}{}M", bytes / MIB, sep)
    } else {
        format!("{}{}G", bytes / GIB, sep)
    }
}

/// Byte count as a page count or a scaled size string.
pub fn pages_or_size(bytes: u64, page_size: u64, pages: bool) -> String {
    if pages {
        return (bytes / page_size.max(1)).to_string();
    }
    format_data(bytes, " ")
}

/// Rounded percentage of `part` in `whole`; an empty whole reports `0%`.
pub fn percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "0%".to_string();
    }
    let value = (part as f64 / whole as f64 * 100.0).round() as i64;
    format!("{}%", value)
}
