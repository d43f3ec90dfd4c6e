//! Frame Log Decoder CLI Application
//!
//! This is the command-line interface for the frame log decoder.
//! It uses the frame-log-decoder library and adds:
//! - Input discovery (files and directories)
//! - Parallel batch decoding
//! - CSV output, one file per log
//! - Text and JSON batch reports

use anyhow::{bail, Result};
use clap::Parser;
use frame_log_decoder::{Decoder, FormatRevision};
use std::path::PathBuf;
use std::time::Instant;

mod batch;
mod config;
mod output;
mod report;

use config::AppConfig;
use report::BatchReport;

/// Frame Log Decoder - Convert binary telemetry logs to CSV
#[derive(Parser, Debug)]
#[command(name = "frame-log-cli")]
#[command(about = "Decode binary telemetry frame logs into CSV", long_about = None)]
#[command(version)]
struct Args {
    /// Log files or directories to decode
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Directory for CSV output (default: ./output)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Format revision of the logger (v1 or v2)
    #[arg(long, value_name = "REV")]
    revision: Option<FormatRevision>,

    /// Byte width per header token, comma separated (e.g. 4,2,2)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    widths: Vec<usize>,

    /// Extension matched when scanning directories
    #[arg(long, value_name = "EXT")]
    extension: Option<String>,

    /// Number of worker threads (default: one per core)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Write a JSON batch report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Frame Log Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", frame_log_decoder::VERSION);

    let mut app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    apply_overrides(&mut app_config, &args);

    if app_config.input.paths.is_empty() {
        println!("Frame Log Decoder - No input specified");
        println!("\nQuick Start:");
        println!("  frame-log-cli data24_12.benji2");
        println!("  frame-log-cli data_benji/ --output processed");
        println!("  frame-log-cli --revision v1 --widths 4,2,2 old_run.benji");
        println!("\nFor calibration overrides:");
        println!("  frame-log-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let format = app_config.format_config();
    let registry = app_config.registry(format.calibration);
    let decoder = Decoder::with_registry(format, registry)?;

    let files = batch::discover_inputs(&app_config.input.paths, &app_config.input.extension)?;
    if files.is_empty() {
        log::warn!(
            "No .{} files found in {:?}",
            app_config.input.extension,
            app_config.input.paths
        );
        return Ok(());
    }

    let output_dir = app_config
        .output
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("output"));

    let start = Instant::now();
    let outcomes = batch::process_files(&decoder, &files, &output_dir, args.jobs)?;
    let report = BatchReport::new(decoder.config().revision, &outcomes, start.elapsed());

    if !args.quiet {
        print!("{}", report.to_text());
    }
    if let Some(path) = &app_config.output.report {
        report.write_json(path)?;
    }

    if report.has_failures() {
        bail!(
            "{} of {} file(s) failed to decode",
            report.failed,
            report.total_files
        );
    }

    Ok(())
}

/// Command-line flags take precedence over the config file
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if !args.paths.is_empty() {
        config.input.paths = args.paths.clone();
    }
    if let Some(extension) = &args.extension {
        config.input.extension = extension.clone();
    }
    if let Some(revision) = args.revision {
        config.format.revision = Some(revision);
    }
    if !args.widths.is_empty() {
        config.format.widths = Some(args.widths.clone());
    }
    if let Some(dir) = &args.output {
        config.output.dir = Some(dir.clone());
    }
    if let Some(report) = &args.report {
        config.output.report = Some(report.clone());
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "frame-log-cli",
            "run.benji2",
            "--revision",
            "v1",
            "--widths",
            "4,2,2",
            "-o",
            "out",
        ]);

        let mut config: AppConfig = toml::from_str(
            r#"
            [input]
            paths = ["ignored"]
            [format]
            revision = "v2"
            alignment_skip = 0
        "#,
        )
        .unwrap();
        apply_overrides(&mut config, &args);

        assert_eq!(config.input.paths, vec![PathBuf::from("run.benji2")]);
        assert_eq!(config.output.dir, Some(PathBuf::from("out")));

        let format = config.format_config();
        assert_eq!(format.revision, FormatRevision::V1);
        assert_eq!(format.alignment_skip, 0);
        assert_eq!(
            format.layout,
            frame_log_decoder::ChannelLayout::Explicit(vec![4, 2, 2])
        );
    }

    #[test]
    fn test_rejects_unknown_revision() {
        let result = Args::try_parse_from(["frame-log-cli", "--revision", "v9"]);
        assert!(result.is_err());
    }
}
