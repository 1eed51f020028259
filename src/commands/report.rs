//! Report command implementation.
//!
//! Inspects one process and prints its memory map as text, JSON or YAML.

use chrono::Local;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use herakles_vmmap::process::{check_target, read_process_info};
use herakles_vmmap::render::{detail_width_for_columns, render_text, RenderContext};
use herakles_vmmap::system::OsVersionSource;
use herakles_vmmap::{inspect, VmmapReport};

use crate::cli::OutputFormat;
use crate::config::{Config, DEFAULT_PROC_ROOT};

/// Columns of the terminal attached to stdout, if any.
fn terminal_columns() -> Option<usize> {
    // SAFETY: isatty and ioctl(TIOCGWINSZ) only read the descriptor state
    // and write into the zero-initialised winsize we own.
    unsafe {
        if libc::isatty(libc::STDOUT_FILENO) != 1 {
            return None;
        }
        let mut ws: libc::winsize = std::mem::zeroed();
        let rc = libc::ioctl(
            libc::STDOUT_FILENO,
            libc::TIOCGWINSZ,
            &mut ws as *mut libc::winsize,
        );
        if rc == 0 && ws.ws_col > 0 {
            return Some(ws.ws_col as usize);
        }
    }
    None
}

fn tool_path() -> String {
    std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "???".to_string())
}

/// Prints the memory map report of `pid`.
pub fn command_report(
    pid: u32,
    config: &Config,
    os_version: &dyn OsVersionSource,
) -> Result<(), Box<dyn std::error::Error>> {
    let proc_root = config.proc_root();

    // Liveness probing only makes sense against the live procfs
    if proc_root == Path::new(DEFAULT_PROC_ROOT) {
        check_target(pid)?;
    }

    let ctx = config.classify_context();
    let entries = inspect(&proc_root, pid, &ctx)?;
    debug!("Classified {} regions for pid {}", entries.len(), pid);

    let report = VmmapReport::build(entries, config.report_options(), ctx.host_page_size);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match config.output_format() {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
        OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(&report)?)?,
        OutputFormat::Text => {
            let process = read_process_info(&proc_root, pid);
            let render_ctx = RenderContext {
                process: &process,
                os_version,
                tool_path: tool_path(),
                tool_version: env!("VERGEN_BUILD_TIMESTAMP").to_string(),
                detail_width: terminal_columns().map(detail_width_for_columns),
                now: Local::now(),
            };
            render_text(&mut out, &report, &render_ctx)?;
        }
    }

    out.flush()?;
    Ok(())
}
