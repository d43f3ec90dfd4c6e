//! Configuration loading and parsing
//!
//! Everything in the TOML file is optional; command-line flags override the
//! file, and the format revision supplies whatever neither of them sets.

use anyhow::{Context, Result};
use frame_log_decoder::{
    ByteOrder, Calibration, CalibrationRegistry, CalibrationTable, ChannelLayout, FormatConfig,
    FormatRevision,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub format: FormatSection,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub calibration: Vec<CalibrationOverride>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Log files or directories
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// File extension picked up when scanning directories
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    "benji2".to_string()
}

/// Format parameters; unset fields come from the revision
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormatSection {
    pub revision: Option<FormatRevision>,
    pub byte_order: Option<ByteOrder>,
    pub header_offset: Option<u32>,
    pub alignment_skip: Option<usize>,
    pub calibration_table: Option<CalibrationTable>,
    /// One byte width per raw header token (switches to the explicit layout)
    pub widths: Option<Vec<usize>>,
    pub sentinel: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory CSV files are written to
    pub dir: Option<PathBuf>,
    /// Path of the JSON batch report
    pub report: Option<PathBuf>,
}

/// A calibration entry added to or replacing one in the selected table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalibrationOverride {
    pub name: String,
    #[serde(flatten)]
    pub calibration: Calibration,
}

impl AppConfig {
    /// Resolve the decoder format configuration
    pub fn format_config(&self) -> FormatConfig {
        let section = &self.format;
        let mut config =
            FormatConfig::for_revision(section.revision.unwrap_or(FormatRevision::V2));

        if let Some(byte_order) = section.byte_order {
            config = config.with_byte_order(byte_order);
        }
        if let Some(offset) = section.header_offset {
            config = config.with_header_offset(offset);
        }
        if let Some(skip) = section.alignment_skip {
            config = config.with_alignment_skip(skip);
        }
        if let Some(table) = section.calibration_table {
            config = config.with_calibration(table);
        }
        if let Some(widths) = &section.widths {
            config = config.with_layout(ChannelLayout::Explicit(widths.clone()));
        }
        if let Some(sentinel) = &section.sentinel {
            // An empty name in the file disables the sentinel
            let sentinel = (!sentinel.is_empty()).then(|| sentinel.clone());
            config = config.with_sentinel(sentinel);
        }

        config
    }

    /// Build the calibration registry: the selected table plus overrides
    pub fn registry(&self, table: CalibrationTable) -> CalibrationRegistry {
        let mut registry = CalibrationRegistry::from_table(table);
        for entry in &self.calibration {
            log::debug!("Calibration override for '{}'", entry.name);
            registry.insert(entry.name.clone(), entry.calibration.clone());
        }
        registry
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
