//! Standalone frame log inspection tool
//!
//! Prints the header, resolved channel schema and the first frames of a log
//! file, plus a short summary.
//!
//! Usage:
//!   inspect_log <file.benji2> [--revision v1|v2] [--limit <count>] [--verbose]
//!
//! Example:
//!   inspect_log data24_12.benji2 --revision v2 --limit 20

use frame_log_decoder::{Decoder, FormatConfig, FormatRevision, Frame, StreamEnd};
use std::env;
use std::path::PathBuf;

struct InspectStats {
    frames: u64,
    missing_values: usize,
    min: Vec<Option<f64>>,
    max: Vec<Option<f64>>,
}

impl InspectStats {
    fn new(channels: usize) -> Self {
        Self {
            frames: 0,
            missing_values: 0,
            min: vec![None; channels],
            max: vec![None; channels],
        }
    }

    fn observe(&mut self, frame: &Frame) {
        self.frames += 1;
        for (i, value) in frame.values.iter().enumerate() {
            match value {
                Some(v) => {
                    self.min[i] = Some(self.min[i].map_or(*v, |m| m.min(*v)));
                    self.max[i] = Some(self.max[i].map_or(*v, |m| m.max(*v)));
                }
                None => self.missing_values += 1,
            }
        }
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <file.benji2> [--revision v1|v2] [--limit <count>] [--verbose]",
            args[0]
        );
        std::process::exit(1);
    }

    let log_file = PathBuf::from(&args[1]);
    let mut revision = FormatRevision::V2;
    let mut limit: usize = 10;
    let mut verbose = false;

    // Parse arguments
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--revision" => {
                i += 1;
                if i < args.len() {
                    revision = args[i].parse()?;
                }
            }
            "--limit" => {
                i += 1;
                if i < args.len() {
                    limit = args[i].parse()?;
                }
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    let decoder = Decoder::new(FormatConfig::for_revision(revision))?;
    let mut stream = decoder.open_file(&log_file)?;

    println!("=== HEADER ({} bytes) ===", stream.raw_header().length);
    if verbose {
        println!("{:?}", stream.raw_header().text);
    }
    for (name, count) in stream.header().counted_names() {
        println!("  {:<16} x{}", name, count);
    }

    println!("\n=== CHANNELS ===");
    for channel in stream.schema().channels() {
        println!(
            "  [{:>2}] {:<16} {} byte(s) {}{}{}",
            channel.position,
            channel.name,
            channel.byte_width,
            if channel.signed { "signed " } else { "" },
            channel.unit.as_deref().unwrap_or(""),
            if channel.is_sentinel() {
                " (sentinel)"
            } else if !channel.calibrated {
                " (uncalibrated)"
            } else {
                ""
            }
        );
    }
    println!("Frame width: {} bytes", stream.schema().frame_width());

    println!("\n=== FRAMES ===");
    let mut stats = InspectStats::new(stream.schema().len());
    for frame in stream.by_ref() {
        if (frame.index as usize) <= limit {
            let values: Vec<String> = frame.values.iter().map(|v| format_value(*v)).collect();
            println!("{:>6}: {}", frame.index, values.join(", "));
        }
        stats.observe(&frame);
    }

    println!("\n=== SUMMARY ===");
    println!("Frames decoded: {}", stats.frames);
    println!("Missing values: {}", stats.missing_values);
    match stream.end() {
        Some(StreamEnd::Clean) | None => println!("Stream ended cleanly"),
        Some(end) => println!("Stream ended: {}", end),
    }
    for (i, name) in stream.schema().names().enumerate() {
        println!(
            "  {:<16} min {:>12} max {:>12}",
            name,
            format_value(stats.min[i]),
            format_value(stats.max[i])
        );
    }

    Ok(())
}
