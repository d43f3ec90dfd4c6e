//! Decoder configuration types
//!
//! The log format changed between logger generations without any version
//! marker in the file itself: the header length prefix counts a different
//! number of terminator bytes, a different number of alignment bytes precede
//! the first frame, and the frame byte order differs. These parameters are
//! therefore chosen by the caller, per file, through [`FormatConfig`].

use crate::calibration::CalibrationTable;
use crate::types::{ByteOrder, DecoderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Channel name that ends the decodable part of a frame
pub const SENTINEL_CHANNEL: &str = "CH_COUNT";

/// Known logger format revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatRevision {
    /// First-generation logger: 2 terminator bytes, 2 alignment bytes, big-endian frames
    V1,
    /// Second-generation logger: 1 terminator byte, 1 alignment byte, little-endian frames
    V2,
}

impl FormatRevision {
    /// Value subtracted from the length prefix to get the header length
    pub fn header_offset(self) -> u32 {
        match self {
            FormatRevision::V1 => 2,
            FormatRevision::V2 => 1,
        }
    }

    /// Bytes between the header text and the first frame
    pub fn alignment_skip(self) -> usize {
        match self {
            FormatRevision::V1 => 2,
            FormatRevision::V2 => 1,
        }
    }

    /// Byte order of frame fields
    pub fn byte_order(self) -> ByteOrder {
        match self {
            FormatRevision::V1 => ByteOrder::Big,
            FormatRevision::V2 => ByteOrder::Little,
        }
    }

    /// Calibration table matching this logger generation
    pub fn calibration_table(self) -> CalibrationTable {
        match self {
            FormatRevision::V1 => CalibrationTable::V1,
            FormatRevision::V2 => CalibrationTable::V2,
        }
    }
}

impl fmt::Display for FormatRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatRevision::V1 => write!(f, "v1"),
            FormatRevision::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for FormatRevision {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(FormatRevision::V1),
            "v2" | "2" => Ok(FormatRevision::V2),
            other => Err(DecoderError::InvalidConfig(format!(
                "Unknown format revision: {}",
                other
            ))),
        }
    }
}

/// Where per-channel byte widths come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    /// One channel per canonical name, `repeat_count` bytes wide
    /// (`TS,TS1,TS2,TS3` is a single 4-byte `TS` field)
    ByteEnumerated,
    /// One channel per raw header token, widths supplied out of band
    Explicit(Vec<usize>),
}

/// Configuration for decoding one log file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Revision the remaining defaults were taken from
    pub revision: FormatRevision,

    /// Subtracted from the 4-byte length prefix to get the header length
    pub header_offset: u32,

    /// Bytes skipped between header text and frame data
    pub alignment_skip: usize,

    /// Byte order of frame fields
    pub byte_order: ByteOrder,

    /// Calibration table used to seed the registry
    pub calibration: CalibrationTable,

    /// Source of per-channel byte widths
    pub layout: ChannelLayout,

    /// Channel name that stops frame decoding early (None disables)
    pub sentinel: Option<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self::for_revision(FormatRevision::V2)
    }
}

impl FormatConfig {
    /// Create the configuration of a known format revision
    pub fn for_revision(revision: FormatRevision) -> Self {
        Self {
            revision,
            header_offset: revision.header_offset(),
            alignment_skip: revision.alignment_skip(),
            byte_order: revision.byte_order(),
            calibration: revision.calibration_table(),
            layout: ChannelLayout::ByteEnumerated,
            sentinel: Some(SENTINEL_CHANNEL.to_string()),
        }
    }

    /// Builder method: override the header length offset
    pub fn with_header_offset(mut self, offset: u32) -> Self {
        self.header_offset = offset;
        self
    }

    /// Builder method: override the post-header alignment skip
    pub fn with_alignment_skip(mut self, skip: usize) -> Self {
        self.alignment_skip = skip;
        self
    }

    /// Builder method: override the frame byte order
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Builder method: select a calibration table
    pub fn with_calibration(mut self, table: CalibrationTable) -> Self {
        self.calibration = table;
        self
    }

    /// Builder method: set the channel layout
    pub fn with_layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Builder method: supply one byte width per raw header token
    pub fn with_explicit_widths(self, widths: Vec<usize>) -> Self {
        self.with_layout(ChannelLayout::Explicit(widths))
    }

    /// Builder method: change or disable the sentinel channel
    pub fn with_sentinel(mut self, sentinel: Option<String>) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Check if a channel name is the configured sentinel
    pub fn is_sentinel(&self, name: &str) -> bool {
        self.sentinel.as_deref() == Some(name)
    }

    /// Reject configurations that can never decode a file
    pub fn validate(&self) -> Result<()> {
        if let ChannelLayout::Explicit(widths) = &self.layout {
            if widths.is_empty() {
                return Err(DecoderError::InvalidConfig(
                    "Explicit layout needs at least one byte width".to_string(),
                ));
            }
        }

        if matches!(self.sentinel.as_deref(), Some("")) {
            return Err(DecoderError::InvalidConfig(
                "Sentinel channel name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_parameters() {
        let v1 = FormatConfig::for_revision(FormatRevision::V1);
        assert_eq!(v1.header_offset, 2);
        assert_eq!(v1.alignment_skip, 2);
        assert_eq!(v1.byte_order, ByteOrder::Big);
        assert_eq!(v1.calibration, CalibrationTable::V1);

        let v2 = FormatConfig::default();
        assert_eq!(v2.revision, FormatRevision::V2);
        assert_eq!(v2.header_offset, 1);
        assert_eq!(v2.alignment_skip, 1);
        assert_eq!(v2.byte_order, ByteOrder::Little);
        assert_eq!(v2.layout, ChannelLayout::ByteEnumerated);
    }

    #[test]
    fn test_config_builder() {
        let config = FormatConfig::for_revision(FormatRevision::V2)
            .with_header_offset(2)
            .with_alignment_skip(0)
            .with_byte_order(ByteOrder::Big)
            .with_calibration(CalibrationTable::V1)
            .with_explicit_widths(vec![4, 2, 2])
            .with_sentinel(None);

        assert_eq!(config.header_offset, 2);
        assert_eq!(config.alignment_skip, 0);
        assert_eq!(config.byte_order, ByteOrder::Big);
        assert_eq!(config.calibration, CalibrationTable::V1);
        assert_eq!(config.layout, ChannelLayout::Explicit(vec![4, 2, 2]));
        assert!(!config.is_sentinel(SENTINEL_CHANNEL));
    }

    #[test]
    fn test_revision_from_str() {
        assert_eq!("v1".parse::<FormatRevision>().unwrap(), FormatRevision::V1);
        assert_eq!("V2".parse::<FormatRevision>().unwrap(), FormatRevision::V2);
        assert!("v3".parse::<FormatRevision>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(FormatConfig::default().validate().is_ok());
        assert!(FormatConfig::default()
            .with_explicit_widths(vec![])
            .validate()
            .is_err());
        assert!(FormatConfig::default()
            .with_sentinel(Some(String::new()))
            .validate()
            .is_err());
    }
}
