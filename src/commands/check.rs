//! Check command implementation.
//!
//! Reports which memory-map source of a process is readable and whether its
//! regions parse and classify.

use herakles_vmmap::process::memory::attempt_source;
use herakles_vmmap::process::{
    check_target, classify_records, parse_region_records, MapFormat, SourceAttempt,
};
use std::path::Path;

use crate::config::{validate_effective_config, Config, DEFAULT_PROC_ROOT};

/// Validates that `pid` can be examined with the effective configuration.
pub fn command_check(pid: u32, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 vmmap - Process Check for pid {}", pid);
    println!("==================================");

    let mut all_ok = true;
    let proc_root = config.proc_root();
    let proc_path = proc_root.join(pid.to_string());

    // Check target process
    if proc_root == Path::new(DEFAULT_PROC_ROOT) {
        println!("\n🎯 Checking target process...");
        match check_target(pid) {
            Ok(()) => println!("   ✅ Process {} is running and may be examined", pid),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }

    // Check memory map sources
    println!("\n💾 Checking memory map sources in {}...", proc_path.display());
    let mut loaded = None;
    for format in [MapFormat::Detailed, MapFormat::Minimal] {
        let path = proc_path.join(format.file_name());
        match attempt_source(&path, format) {
            Ok(SourceAttempt::Loaded(source)) => {
                println!(
                    "   ✅ {} readable ({} bytes)",
                    format.file_name(),
                    source.text.len()
                );
                if loaded.is_none() {
                    loaded = Some(source);
                }
            }
            Ok(SourceAttempt::TryNext(e)) => {
                println!("   ⚠️  {} not available: {}", format.file_name(), e);
            }
            Err(e) => {
                println!("   ❌ {} failed while reading: {}", format.file_name(), e);
            }
        }
    }

    match &loaded {
        Some(source) => {
            let records = parse_region_records(&source.text);
            println!(
                "   ✅ Parsed {} regions from {}",
                records.len(),
                source.format.file_name()
            );
            match classify_records(&records, &config.classify_context()) {
                Ok(entries) => println!("   ✅ Classified {} regions", entries.len()),
                Err(e) => {
                    println!("   ❌ Classification failed: {}", e);
                    all_ok = false;
                }
            }
        }
        None => {
            println!("   ❌ No memory map source readable");
            all_ok = false;
        }
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - process can be examined");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review the output above");
        std::process::exit(1);
    }
}
