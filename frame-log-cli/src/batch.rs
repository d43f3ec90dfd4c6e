//! Multi-file processing
//!
//! Every input file is decoded independently into `<output>/<stem>.csv`.
//! Inputs sharing a stem are written to `<output>/<parent>/<stem>.csv`
//! instead, so no two files ever share a CSV. Files are spread over a rayon pool; a failing file is recorded in its
//! outcome and never stops the rest of the batch.

use crate::output::CsvEmitter;
use anyhow::{bail, Context, Result};
use frame_log_decoder::{DecodeSummary, Decoder};
use rayon::prelude::*;
use std::fs;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Result of decoding one input file
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: std::result::Result<DecodeSummary, String>,
    pub elapsed: Duration,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Expand input paths into a list of log files
///
/// Directories are scanned (not recursively) for files with the given
/// extension, compared case-insensitively. Explicit file paths are taken as
/// they are. The result is sorted and free of duplicates.
pub fn discover_inputs(paths: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .with_context(|| format!("Failed to read directory: {:?}", path))?;
            for entry in entries {
                let entry_path = entry?.path();
                if entry_path.is_file() && has_extension(&entry_path, extension) {
                    files.push(entry_path);
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("Input path does not exist: {:?}", path);
        }
    }

    files.sort();
    files.dedup();
    log::debug!("Discovered {} input file(s)", files.len());
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// CSV path for an input file
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.csv", file_stem(input)))
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// CSV paths for a whole batch, one per input, never shared
///
/// Inputs whose stems collide go under a subdirectory named after their
/// parent directory; anything still colliding gets a numeric suffix.
pub fn assign_outputs(files: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
    let mut flat_counts: HashMap<PathBuf, usize> = HashMap::new();
    for input in files {
        *flat_counts.entry(output_path(input, output_dir)).or_default() += 1;
    }

    let mut taken = HashSet::new();
    files
        .iter()
        .map(|input| {
            let flat = output_path(input, output_dir);
            let shared = flat_counts[&flat] > 1;
            let base = match input.parent().and_then(Path::file_name) {
                Some(session) if shared => output_path(input, &output_dir.join(session)),
                _ => flat,
            };

            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = base.with_file_name(format!("{}_{}.csv", file_stem(input), n));
                n += 1;
            }
            if shared {
                log::info!("{:?} shares its name with another input, writing {:?}", input, candidate);
            }
            candidate
        })
        .collect()
}

/// Decode every file, optionally on a pool of `jobs` threads
///
/// Outcomes are returned in input order.
pub fn process_files(
    decoder: &Decoder,
    files: &[PathBuf],
    output_dir: &Path,
    jobs: Option<usize>,
) -> Result<Vec<FileOutcome>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let outputs = assign_outputs(files, output_dir);
    let done = AtomicUsize::new(0);
    let total = files.len();
    let run = || -> Vec<FileOutcome> {
        files
            .par_iter()
            .zip(outputs.par_iter())
            .map(|(input, output)| {
                let outcome = process_file(decoder, input, output);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                match &outcome.result {
                    Ok(summary) => log::info!(
                        "[{}/{}] {:?}: {} frames",
                        n,
                        total,
                        input,
                        summary.frames
                    ),
                    Err(e) => log::error!("[{}/{}] {:?}: {}", n, total, input, e),
                }
                outcome
            })
            .collect()
    };

    match jobs {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("Failed to build worker pool")?;
            Ok(pool.install(run))
        }
        None => Ok(run()),
    }
}

/// Decode one file into the given CSV
pub fn process_file(decoder: &Decoder, input: &Path, output: &Path) -> FileOutcome {
    let start = Instant::now();
    let result = decode_to_csv(decoder, input, output).map_err(|e| format!("{:#}", e));

    FileOutcome {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        result,
        elapsed: start.elapsed(),
    }
}

fn decode_to_csv(decoder: &Decoder, input: &Path, output: &Path) -> Result<DecodeSummary> {
    // The header is read before the CSV is created, so a malformed file
    // leaves no output behind
    let stream = decoder
        .open_file(input)
        .with_context(|| format!("Failed to decode {:?}", input))?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    let mut emitter = CsvEmitter::create(output)
        .with_context(|| format!("Failed to create {:?}", output))?;
    let summary = stream
        .emit_all(&mut emitter)
        .with_context(|| format!("Failed to write {:?}", output))?;

    Ok(summary)
}
