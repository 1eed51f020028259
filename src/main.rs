//! vmmap - version 0.1.0
//!
//! Virtual memory map reporter with tracing logging.
//! This is the main entry point that resolves configuration and dispatches
//! to the report or one of the subcommands.

mod cli;
mod commands;
mod config;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use herakles_vmmap::system::ProcOsVersion;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_report};
use config::{resolve_config, show_config, validate_effective_config};

/// Initializes tracing logging subsystem with configured log level.
/// Logs go to stderr so the report on stdout stays clean.
fn setup_logging(level: LogLevel) {
    let filter = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("vmmap: failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", level);
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Generating a config file must work even when the current one is broken
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), *format, *commented);
    }

    let config = resolve_config(&args)?;
    setup_logging(config.log_level());
    debug!("Effective configuration: {:?}", config);

    if args.check_config {
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        return show_config(&config, args.config_format);
    }

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    // Host OS version source for the report overview
    let os_version = ProcOsVersion::default();

    match &args.command {
        Some(Commands::Check { pid }) => command_check(*pid, &config),
        Some(Commands::Config { .. }) => Ok(()),
        None => match args.pid {
            Some(pid) => command_report(pid, &config, &os_version),
            None => Args::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    "a process ID is required: vmmap [OPTIONS] <PID>",
                )
                .exit(),
        },
    }
}

/// Main application entry point.
fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("vmmap: {}", e);
        std::process::exit(1);
    }
}
