//! Versioned calibration tables
//!
//! The two logger generations use different constants for the same channel
//! names (strain gauges, IMU scaling, time base). Each generation gets its own
//! table; a registry is always seeded from exactly one of them.

use super::registry::{Calibration, CalibrationFunction, ConversionRule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute zero offset of the IR thermometers (0.02 K per count)
const KELVIN_OFFSET: f64 = -273.15;
const KELVIN_SCALE: f64 = 0.02;

/// Identifies one versioned calibration table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationTable {
    /// First-generation logger: millisecond time base, zero/span strain gauges
    V1,
    /// Second-generation logger: microsecond time base, fitted strain gauges, scaled IMU
    V2,
}

impl fmt::Display for CalibrationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationTable::V1 => write!(f, "v1"),
            CalibrationTable::V2 => write!(f, "v2"),
        }
    }
}

impl CalibrationTable {
    /// All entries of this table
    pub fn entries(self) -> Vec<(&'static str, Calibration)> {
        match self {
            CalibrationTable::V1 => v1_entries(),
            CalibrationTable::V2 => v2_entries(),
        }
    }
}

fn temperature() -> Calibration {
    Calibration::unsigned(ConversionRule::affine(KELVIN_SCALE, KELVIN_OFFSET)).with_unit("°C")
}

fn power_channels() -> Vec<(&'static str, Calibration)> {
    vec![
        (
            "CURRENT",
            Calibration::signed(ConversionRule::scale(1.25)).with_unit("A"),
        ),
        (
            "BATTERY",
            Calibration::signed(ConversionRule::scale(1.25 / 1000.0)).with_unit("V"),
        ),
    ]
}

fn v1_entries() -> Vec<(&'static str, Calibration)> {
    let mut entries = vec![(
        "TS",
        Calibration::unsigned(ConversionRule::scale(1.0 / 1000.0)).with_unit("s"),
    )];
    entries.extend(power_channels());

    let strain = |zero: f64, gain: f64| {
        Calibration::unsigned(ConversionRule::Function(CalibrationFunction::ZeroSpan {
            zero,
            gain,
        }))
        .with_unit("lbs")
    };
    entries.push(("FL_SG", strain(1432.0, 4.7 / 10.0)));
    entries.push(("FR_SG", strain(63608.0, -(4.7 / 9.24))));
    entries.push(("RL_SG", strain(931.0, 4.7 / 7.3)));

    for name in ["IMU_X_ACCEL", "IMU_Y_ACCEL", "IMU_Z_ACCEL"] {
        entries.push((name, Calibration::signed(ConversionRule::Identity)));
    }
    for name in ["IMU_X_GYRO", "IMU_Y_GYRO", "IMU_Z_GYRO"] {
        entries.push((name, Calibration::signed(ConversionRule::Identity)));
    }

    for name in [
        "FLW_AMB", "FRW_AMB", "RLW_AMB", "RRW_AMB", "FLW_RTR", "FRW_RTR", "RLW_RTR", "RRW_RTR",
    ] {
        entries.push((name, temperature()));
    }

    entries
}

fn v2_entries() -> Vec<(&'static str, Calibration)> {
    let mut entries = vec![(
        "TS",
        Calibration::unsigned(ConversionRule::scale(1e-6)).with_unit("s"),
    )];
    entries.extend(power_channels());

    let fitted = |scale: f64, offset: f64, unit: &str| {
        Calibration::unsigned(ConversionRule::affine(scale, offset)).with_unit(unit)
    };

    entries.push(("FL_SG", fitted(-11052026.1, 2606.22253, "lbs")));
    entries.push(("RL_SG", fitted(-1401922.44, 92026.0137, "lbs")));
    // Not yet fitted on this logger generation
    entries.push(("FR_SG", Calibration::unsigned(ConversionRule::Identity).with_unit("lbs")));
    entries.push(("RR_SG", Calibration::unsigned(ConversionRule::Identity).with_unit("lbs")));

    for name in ["IMU_X_ACCEL", "IMU_Y_ACCEL", "IMU_Z_ACCEL"] {
        entries.push((name, Calibration::signed(ConversionRule::scale(0.122)).with_unit("g")));
    }
    for name in ["IMU_X_GYRO", "IMU_Y_GYRO", "IMU_Z_GYRO"] {
        entries.push((
            name,
            Calibration::signed(ConversionRule::scale(17.50)).with_unit("deg/s"),
        ));
    }

    for name in [
        "FLW_AMB", "FRW_AMB", "RLW_AMB", "RRW_AMB", "FLW_OBJ", "FRW_OBJ", "RLW_OBJ", "RRW_OBJ",
    ] {
        entries.push((name, temperature()));
    }

    entries.push(("STEERING", fitted(0.084769, -152.846451, "deg")));
    entries.push(("FRSHOCK", fitted(-0.018444, 75.894221, "mm")));
    entries.push(("FLSHOCK", fitted(-0.018586, 76.399026, "mm")));
    entries.push(("RLSHOCK", fitted(-0.018600, 76.618397, "mm")));
    entries.push(("RRSHOCK", fitted(-0.018498, 76.591013, "mm")));

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tables_have_unique_names() {
        for table in [CalibrationTable::V1, CalibrationTable::V2] {
            let entries = table.entries();
            let names: HashSet<_> = entries.iter().map(|(name, _)| *name).collect();
            assert_eq!(names.len(), entries.len(), "duplicate entry in {}", table);
        }
    }

    #[test]
    fn test_tables_disagree_on_time_base() {
        let find = |table: CalibrationTable, name: &str| {
            table
                .entries()
                .into_iter()
                .find(|(n, _)| *n == name)
                .map(|(_, c)| c)
        };

        let v1 = find(CalibrationTable::V1, "TS").unwrap();
        let v2 = find(CalibrationTable::V2, "TS").unwrap();
        assert!((v1.conversion.apply(1000.0) - 1.0).abs() < 1e-12);
        assert!((v2.conversion.apply(1_000_000.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_imu_channels_are_signed() {
        for table in [CalibrationTable::V1, CalibrationTable::V2] {
            for (name, calibration) in table.entries() {
                if name.starts_with("IMU_") {
                    assert!(calibration.signed, "{} should be signed in {}", name, table);
                }
            }
        }
    }

    #[test]
    fn test_temperature_conversion() {
        let kelvin_zero = (273.15 / KELVIN_SCALE).round();
        let celsius = temperature().conversion.apply(kelvin_zero);
        assert!(celsius.abs() < KELVIN_SCALE);
    }
}
