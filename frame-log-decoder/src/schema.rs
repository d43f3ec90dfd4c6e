//! Channel schema
//!
//! Combines a resolved header with per-channel byte widths and the calibration
//! registry into the ordered list of channel descriptors that drives frame
//! decoding. The schema is built once per file and never changes afterwards.

use crate::calibration::{CalibrationRegistry, ConversionRule};
use crate::config::{ChannelLayout, FormatConfig};
use crate::header::CanonicalHeader;
use crate::types::{ByteOrder, DecoderError, RawValue, Result};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

/// Widest field a channel may have; raw values are held in 64-bit integers
pub const MAX_BYTE_WIDTH: usize = 8;

/// Role of a channel slot in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Carries a measurement
    Data,
    /// Ends the decodable part of the frame; never read
    Sentinel,
}

/// A fully configured channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    /// Channel name as it appeared in the header
    pub name: String,
    /// Index in the frame and column in the output row
    pub position: usize,
    /// Bytes per frame
    pub byte_width: usize,
    /// Integer byte order
    pub byte_order: ByteOrder,
    /// Two's complement field
    pub signed: bool,
    /// Raw to physical conversion
    pub conversion: ConversionRule,
    /// Data slot or sentinel
    pub kind: ChannelKind,
    /// False when the registry had no entry and the identity default was used
    pub calibrated: bool,
    /// Engineering unit, if the registry knows it
    pub unit: Option<String>,
}

impl ChannelDescriptor {
    pub fn is_sentinel(&self) -> bool {
        self.kind == ChannelKind::Sentinel
    }

    /// Interpret a field as an integer
    ///
    /// `bytes` must hold exactly `byte_width` bytes.
    pub fn raw_value(&self, bytes: &[u8]) -> RawValue {
        let n = bytes.len();
        match (self.byte_order, self.signed) {
            (ByteOrder::Little, false) => RawValue::Unsigned(LittleEndian::read_uint(bytes, n)),
            (ByteOrder::Little, true) => RawValue::Signed(LittleEndian::read_int(bytes, n)),
            (ByteOrder::Big, false) => RawValue::Unsigned(BigEndian::read_uint(bytes, n)),
            (ByteOrder::Big, true) => RawValue::Signed(BigEndian::read_int(bytes, n)),
        }
    }

    /// Interpret a field and apply the channel's conversion
    pub fn decode(&self, bytes: &[u8]) -> f64 {
        self.conversion.apply(self.raw_value(bytes).as_f64())
    }
}

/// Ordered channel descriptors of one log file
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSchema {
    channels: Vec<ChannelDescriptor>,
}

impl ChannelSchema {
    /// Build descriptors from `(name, byte_width)` slots in frame order
    pub fn build<S: AsRef<str>>(
        slots: &[(S, usize)],
        registry: &CalibrationRegistry,
        config: &FormatConfig,
    ) -> Result<Self> {
        if slots.is_empty() {
            return Err(DecoderError::InvalidSchema(
                "Header declares no channels".to_string(),
            ));
        }

        let mut channels = Vec::with_capacity(slots.len());

        for (position, (name, byte_width)) in slots.iter().enumerate() {
            let name = name.as_ref();
            let byte_width = *byte_width;

            if byte_width == 0 {
                return Err(DecoderError::InvalidSchema(format!(
                    "Channel '{}' at position {} has zero byte width",
                    name, position
                )));
            }

            if config.is_sentinel(name) {
                log::debug!("Sentinel '{}' at position {}", name, position);
                channels.push(ChannelDescriptor {
                    name: name.to_string(),
                    position,
                    byte_width,
                    byte_order: config.byte_order,
                    signed: false,
                    conversion: ConversionRule::Identity,
                    kind: ChannelKind::Sentinel,
                    calibrated: false,
                    unit: None,
                });
                continue;
            }

            if byte_width > MAX_BYTE_WIDTH {
                return Err(DecoderError::InvalidSchema(format!(
                    "Channel '{}' is {} bytes wide (maximum {})",
                    name, byte_width, MAX_BYTE_WIDTH
                )));
            }

            let calibrated = registry.contains(name);
            if !calibrated {
                log::debug!(
                    "No calibration for channel '{}', decoding as unsigned identity",
                    name
                );
            }
            let calibration = registry.lookup(name);

            channels.push(ChannelDescriptor {
                name: name.to_string(),
                position,
                byte_width,
                byte_order: config.byte_order,
                signed: calibration.signed,
                conversion: calibration.conversion,
                kind: ChannelKind::Data,
                calibrated,
                unit: calibration.unit,
            });
        }

        let schema = Self { channels };
        if schema.frame_width() == 0 {
            return Err(DecoderError::InvalidSchema(
                "No decodable channel before the sentinel".to_string(),
            ));
        }

        log::debug!(
            "Schema: {} channels, {} bytes per frame",
            schema.len(),
            schema.frame_width()
        );
        Ok(schema)
    }

    /// Build the schema of a resolved header using the configured layout
    pub fn from_header(
        header: &CanonicalHeader,
        registry: &CalibrationRegistry,
        config: &FormatConfig,
    ) -> Result<Self> {
        match &config.layout {
            ChannelLayout::ByteEnumerated => {
                let slots: Vec<(&str, usize)> = header.counted_names().collect();
                Self::build(&slots, registry, config)
            }
            ChannelLayout::Explicit(widths) => {
                if widths.len() != header.tokens.len() {
                    return Err(DecoderError::InvalidSchema(format!(
                        "Header has {} tokens but {} byte widths were supplied",
                        header.tokens.len(),
                        widths.len()
                    )));
                }
                let slots: Vec<(&str, usize)> = header
                    .tokens
                    .iter()
                    .map(String::as_str)
                    .zip(widths.iter().copied())
                    .collect();
                Self::build(&slots, registry, config)
            }
        }
    }

    /// Descriptors in position order
    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channel names in position order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.iter().map(|c| c.name.as_str())
    }

    /// Position of the first channel with the given name
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    /// Bytes read per frame (fields up to the first sentinel)
    pub fn frame_width(&self) -> usize {
        self.channels
            .iter()
            .take_while(|c| !c.is_sentinel())
            .map(|c| c.byte_width)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{Calibration, CalibrationTable};
    use crate::header::resolve_header;

    fn v2_registry() -> CalibrationRegistry {
        CalibrationRegistry::from_table(CalibrationTable::V2)
    }

    #[test]
    fn test_explicit_layout_positions() {
        let config = FormatConfig::default().with_explicit_widths(vec![4, 2, 2]);
        let header = resolve_header("TS,CURRENT,BATTERY");
        let schema = ChannelSchema::from_header(&header, &v2_registry(), &config).unwrap();

        assert_eq!(schema.len(), 3);
        for (i, channel) in schema.channels().iter().enumerate() {
            assert_eq!(channel.position, i);
        }
        assert_eq!(schema.frame_width(), 8);
        assert!(schema.channels()[1].signed);
        assert_eq!(schema.channels()[0].unit.as_deref(), Some("s"));
    }

    #[test]
    fn test_explicit_layout_keeps_every_token() {
        // Repeated hardware readings each get their own slot
        let config = FormatConfig::default().with_explicit_widths(vec![4, 1, 1, 1]);
        let header = resolve_header("TS,CH,CH1,CH2");
        let schema = ChannelSchema::from_header(&header, &v2_registry(), &config).unwrap();

        assert_eq!(header.names.len(), 2);
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["TS", "CH", "CH1", "CH2"]);
        assert_eq!(schema.frame_width(), 7);
    }

    #[test]
    fn test_explicit_width_count_mismatch() {
        let config = FormatConfig::default().with_explicit_widths(vec![4, 2]);
        let header = resolve_header("TS,CURRENT,BATTERY");
        let result = ChannelSchema::from_header(&header, &v2_registry(), &config);
        assert!(matches!(result, Err(DecoderError::InvalidSchema(_))));
    }

    #[test]
    fn test_byte_enumerated_layout() {
        let config = FormatConfig::default();
        let header = resolve_header("TS,TS1,TS2,TS3,CURRENT,CURRENT1,DRS");
        let schema = ChannelSchema::from_header(&header, &v2_registry(), &config).unwrap();

        let widths: Vec<_> = schema.channels().iter().map(|c| c.byte_width).collect();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["TS", "CURRENT", "DRS"]);
        assert_eq!(widths, vec![4, 2, 1]);
    }

    #[test]
    fn test_unknown_channel_is_flagged() {
        let config = FormatConfig::default().with_explicit_widths(vec![2]);
        let header = resolve_header("FOO");
        let schema = ChannelSchema::from_header(&header, &v2_registry(), &config).unwrap();

        let foo = &schema.channels()[0];
        assert!(!foo.calibrated);
        assert!(!foo.signed);
        assert!(foo.conversion.is_identity());
    }

    #[test]
    fn test_deliberate_identity_is_calibrated() {
        let registry = v2_registry();
        let config = FormatConfig::default().with_explicit_widths(vec![2]);
        let schema =
            ChannelSchema::from_header(&resolve_header("FR_SG"), &registry, &config).unwrap();

        assert!(schema.channels()[0].conversion.is_identity());
        assert!(schema.channels()[0].calibrated);
    }

    #[test]
    fn test_sentinel_skips_calibration() {
        let registry = v2_registry().with_entry(
            "CH_COUNT",
            Calibration::signed(ConversionRule::scale(3.0)),
        );
        let config = FormatConfig::default().with_explicit_widths(vec![4, 1, 2]);
        let header = resolve_header("TS,CH_COUNT,CURRENT");
        let schema = ChannelSchema::from_header(&header, &registry, &config).unwrap();

        let sentinel = &schema.channels()[1];
        assert!(sentinel.is_sentinel());
        assert!(sentinel.conversion.is_identity());
        assert!(!sentinel.signed);
        assert_eq!(schema.frame_width(), 4);
    }

    #[test]
    fn test_sentinel_first_is_rejected() {
        let config = FormatConfig::default().with_explicit_widths(vec![1, 4]);
        let header = resolve_header("CH_COUNT,TS");
        let result = ChannelSchema::from_header(&header, &v2_registry(), &config);
        assert!(matches!(result, Err(DecoderError::InvalidSchema(_))));
    }

    #[test]
    fn test_invalid_widths_are_rejected() {
        let registry = v2_registry();
        let config = FormatConfig::default();

        let zero = ChannelSchema::build(&[("TS", 0)], &registry, &config);
        assert!(matches!(zero, Err(DecoderError::InvalidSchema(_))));

        let wide = ChannelSchema::build(&[("TS", 9)], &registry, &config);
        assert!(matches!(wide, Err(DecoderError::InvalidSchema(_))));

        let empty: [(&str, usize); 0] = [];
        let none = ChannelSchema::build(&empty, &registry, &config);
        assert!(matches!(none, Err(DecoderError::InvalidSchema(_))));
    }

    #[test]
    fn test_raw_value_byte_orders() {
        let registry = CalibrationRegistry::empty()
            .with_entry("S", Calibration::signed(ConversionRule::Identity));

        let little = FormatConfig::default();
        let big = FormatConfig::default().with_byte_order(ByteOrder::Big);

        let le = ChannelSchema::build(&[("U", 2), ("S", 2)], &registry, &little).unwrap();
        let be = ChannelSchema::build(&[("U", 2), ("S", 2)], &registry, &big).unwrap();

        assert_eq!(le.channels()[0].raw_value(&[0x34, 0x12]), RawValue::Unsigned(0x1234));
        assert_eq!(be.channels()[0].raw_value(&[0x12, 0x34]), RawValue::Unsigned(0x1234));
        assert_eq!(le.channels()[1].raw_value(&[0xFF, 0xFF]), RawValue::Signed(-1));
        assert_eq!(be.channels()[1].raw_value(&[0x80, 0x00]), RawValue::Signed(-32768));
    }

    #[test]
    fn test_odd_widths() {
        let registry = CalibrationRegistry::empty();
        let config = FormatConfig::default();
        let schema = ChannelSchema::build(&[("A", 3), ("B", 8)], &registry, &config).unwrap();

        assert_eq!(
            schema.channels()[0].raw_value(&[0x01, 0x02, 0x03]),
            RawValue::Unsigned(0x030201)
        );
        assert_eq!(
            schema.channels()[1].raw_value(&[0xFF; 8]),
            RawValue::Unsigned(u64::MAX)
        );
    }
}
