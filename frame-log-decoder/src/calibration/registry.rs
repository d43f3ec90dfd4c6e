//! Calibration registry
//!
//! Maps a channel name to the rule that turns its raw integer into a physical
//! value. The table is built once per registry; looking a name up is a single
//! hash map access.

use super::tables::CalibrationTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Conversion from a raw decoded integer to an engineering-unit value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversionRule {
    /// Raw value passed through as a float
    #[default]
    Identity,
    /// `scale * raw + offset`
    Affine { scale: f64, offset: f64 },
    /// Table-driven function with its own constant set
    Function(CalibrationFunction),
}

/// Sensor-specific calibration functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum CalibrationFunction {
    /// `gain * (raw - zero)`, a zero point and span fitted per sensor
    ZeroSpan { zero: f64, gain: f64 },
    /// `c0 + c1*raw + c2*raw^2 + ...`
    Polynomial { coefficients: Vec<f64> },
}

impl ConversionRule {
    /// Shorthand for a pure scale factor
    pub fn scale(scale: f64) -> Self {
        ConversionRule::Affine { scale, offset: 0.0 }
    }

    /// Shorthand for scale and offset
    pub fn affine(scale: f64, offset: f64) -> Self {
        ConversionRule::Affine { scale, offset }
    }

    /// Apply the rule to a raw integer (already widened to f64)
    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            ConversionRule::Identity => raw,
            ConversionRule::Affine { scale, offset } => scale * raw + offset,
            ConversionRule::Function(function) => function.apply(raw),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ConversionRule::Identity)
    }
}

impl CalibrationFunction {
    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            CalibrationFunction::ZeroSpan { zero, gain } => gain * (raw - zero),
            // Horner's method, highest order first
            CalibrationFunction::Polynomial { coefficients } => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, c| acc * raw + c),
        }
    }
}

/// Calibration of a single channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Calibration {
    /// Whether the raw field is two's complement
    #[serde(default)]
    pub signed: bool,
    /// Raw to physical conversion
    #[serde(default)]
    pub conversion: ConversionRule,
    /// Engineering unit of the converted value
    #[serde(default)]
    pub unit: Option<String>,
}

impl Calibration {
    /// Unsigned channel with the given conversion
    pub fn unsigned(conversion: ConversionRule) -> Self {
        Self {
            signed: false,
            conversion,
            unit: None,
        }
    }

    /// Signed channel with the given conversion
    pub fn signed(conversion: ConversionRule) -> Self {
        Self {
            signed: true,
            conversion,
            unit: None,
        }
    }

    /// Builder method: attach an engineering unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Static lookup table from channel name to calibration
///
/// Names are matched exactly (case-sensitive, canonical form). Names missing
/// from the table resolve to an unsigned identity calibration.
#[derive(Debug, Clone, Default)]
pub struct CalibrationRegistry {
    /// Versioned table this registry was seeded from (None for custom tables)
    table: Option<CalibrationTable>,
    entries: HashMap<String, Calibration>,
}

impl CalibrationRegistry {
    /// Registry with no entries: every channel decodes as unsigned identity
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry seeded from one versioned table
    pub fn from_table(table: CalibrationTable) -> Self {
        let entries = table
            .entries()
            .into_iter()
            .map(|(name, calibration)| (name.to_string(), calibration))
            .collect();

        Self {
            table: Some(table),
            entries,
        }
    }

    /// Builder method: add or replace the entry for one channel
    pub fn with_entry(mut self, name: impl Into<String>, calibration: Calibration) -> Self {
        self.insert(name, calibration);
        self
    }

    /// Add or replace the entry for one channel
    pub fn insert(&mut self, name: impl Into<String>, calibration: Calibration) {
        let name = name.into();
        if self.entries.insert(name.clone(), calibration).is_some() {
            log::debug!("Calibration for '{}' overridden", name);
        }
    }

    /// Entry for a channel, if the table has one
    pub fn get(&self, name: &str) -> Option<&Calibration> {
        self.entries.get(name)
    }

    /// Calibration for a channel, falling back to unsigned identity
    pub fn lookup(&self, name: &str) -> Calibration {
        self.get(name).cloned().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Versioned table the registry was built from
    pub fn table(&self) -> Option<CalibrationTable> {
        self.table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
