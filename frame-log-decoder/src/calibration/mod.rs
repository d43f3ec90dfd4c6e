//! Channel calibration
//!
//! This module contains the calibration registry and the versioned tables it
//! is seeded from.

pub mod registry;
pub mod tables;

// Re-export key types for convenience
pub use registry::{Calibration, CalibrationFunction, CalibrationRegistry, ConversionRule};
pub use tables::CalibrationTable;
