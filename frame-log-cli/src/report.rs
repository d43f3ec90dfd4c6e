//! Batch report generation
//!
//! A plain-text summary for the terminal and an optional JSON report with one
//! entry per input file.

use crate::batch::FileOutcome;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use frame_log_decoder::{FormatRevision, StreamEnd};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub revision: FormatRevision,
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_frames: u64,
    pub elapsed_secs: f64,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate_hz: Option<u32>,
    /// How the frame stream ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Decoded to the last complete frame
    Ok,
    /// Decoded, but the stream ended mid-frame or on a read error
    Partial,
    Failed,
}

impl FileReport {
    fn from_outcome(outcome: &FileOutcome) -> Self {
        let elapsed_ms = outcome.elapsed.as_millis();
        match &outcome.result {
            Ok(summary) => Self {
                input: outcome.input.clone(),
                output: Some(outcome.output.clone()),
                status: if summary.end == StreamEnd::Clean {
                    FileStatus::Ok
                } else {
                    FileStatus::Partial
                },
                frames: Some(summary.frames),
                channels: Some(summary.channels),
                sample_rate_hz: summary.sample_rate_hz,
                end: Some(summary.end.to_string()),
                error: None,
                elapsed_ms,
            },
            Err(e) => Self {
                input: outcome.input.clone(),
                output: None,
                status: FileStatus::Failed,
                frames: None,
                channels: None,
                sample_rate_hz: None,
                end: None,
                error: Some(e.clone()),
                elapsed_ms,
            },
        }
    }
}

impl BatchReport {
    pub fn new(revision: FormatRevision, outcomes: &[FileOutcome], elapsed: Duration) -> Self {
        let files: Vec<FileReport> = outcomes.iter().map(FileReport::from_outcome).collect();
        let failed = files
            .iter()
            .filter(|f| f.status == FileStatus::Failed)
            .count();

        Self {
            generated_at: Utc::now(),
            revision,
            total_files: files.len(),
            succeeded: files.len() - failed,
            failed,
            total_frames: files.iter().filter_map(|f| f.frames).sum(),
            elapsed_secs: elapsed.as_secs_f64(),
            files,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Render the terminal summary
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("═══════════════════════════════════════════════\n");
        out.push_str(&format!("  Frame Log Decoder - {} files\n", self.revision));
        out.push_str("═══════════════════════════════════════════════\n");

        for file in &self.files {
            let name = file.input.display();
            match file.status {
                FileStatus::Failed => out.push_str(&format!(
                    "  ✗ {}: {}\n",
                    name,
                    file.error.as_deref().unwrap_or("unknown error")
                )),
                status => {
                    let marker = if status == FileStatus::Ok { '✓' } else { '~' };
                    let rate = file
                        .sample_rate_hz
                        .map(|hz| format!(", {} Hz", hz))
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "  {} {}: {} frames{} ({})\n",
                        marker,
                        name,
                        file.frames.unwrap_or(0),
                        rate,
                        file.end.as_deref().unwrap_or("")
                    ));
                }
            }
        }

        out.push_str("───────────────────────────────────────────────\n");
        out.push_str(&format!(
            "  Files: {} ok, {} failed, {} total\n",
            self.succeeded, self.failed, self.total_files
        ));
        out.push_str(&format!("  Frames: {}\n", self.total_frames));
        out.push_str(&format!("  Time: {:.2}s\n", self.elapsed_secs));
        out
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
        log::info!("Report written to {:?}", path);
        Ok(())
    }
}
