//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! A [`Decoder`] holds one format configuration and the calibration registry
//! built from it, and turns log files (or any byte stream) into frames.

use crate::calibration::CalibrationRegistry;
use crate::config::FormatConfig;
use crate::emitter::RowEmitter;
use crate::frame_decoder::FrameDecoder;
use crate::header::{read_raw_header, resolve_header, CanonicalHeader, RawHeader};
use crate::schema::ChannelSchema;
use crate::types::{DecoderError, Frame, Result, StreamEnd};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Channel used to estimate the sample rate
pub const TIME_CHANNEL: &str = "TS";

/// The main decoder struct - entry point for all decoding operations
///
/// A decoder has no per-file state, so one instance can decode any number of
/// files, one after another or from several threads.
#[derive(Debug, Clone)]
pub struct Decoder {
    config: FormatConfig,
    registry: CalibrationRegistry,
}

impl Decoder {
    /// Create a decoder whose registry is seeded from the configured table
    ///
    /// # Example
    /// ```no_run
    /// use frame_log_decoder::{Decoder, FormatConfig, FormatRevision};
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::new(FormatConfig::for_revision(FormatRevision::V2)).unwrap();
    /// let stream = decoder.open_file(Path::new("data24_12.benji2")).unwrap();
    /// for frame in stream {
    ///     println!("{} {:?}", frame.index, frame.values);
    /// }
    /// ```
    pub fn new(config: FormatConfig) -> Result<Self> {
        let registry = CalibrationRegistry::from_table(config.calibration);
        Self::with_registry(config, registry)
    }

    /// Create a decoder with a caller-supplied registry
    pub fn with_registry(config: FormatConfig, registry: CalibrationRegistry) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "Decoder for format {} ({} calibration entries)",
            config.revision,
            registry.len()
        );
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    pub fn registry(&self) -> &CalibrationRegistry {
        &self.registry
    }

    /// Read the header of a stream and prepare to decode its frames
    ///
    /// The header is parsed eagerly: a malformed header fails here, before
    /// any frame is produced.
    pub fn decode_reader<R: Read>(&self, mut reader: R) -> Result<FrameStream<R>> {
        let raw_header = read_raw_header(&mut reader, &self.config)?;
        let header = resolve_header(&raw_header.text);
        let schema = ChannelSchema::from_header(&header, &self.registry, &self.config)?;

        Ok(FrameStream {
            raw_header,
            header,
            frames: FrameDecoder::new(reader, schema),
        })
    }

    /// Open a log file and prepare to decode its frames
    pub fn open_file(&self, path: &Path) -> Result<FrameStream<BufReader<File>>> {
        log::info!("Decoding log file: {:?}", path);

        let file = File::open(path).map_err(DecoderError::Io)?;
        self.decode_reader(BufReader::new(file))
    }

    /// Decode a whole stream into an emitter
    pub fn decode_into<R, E>(&self, reader: R, emitter: &mut E) -> Result<DecodeSummary>
    where
        R: Read,
        E: RowEmitter + ?Sized,
    {
        let stream = self.decode_reader(reader)?;
        stream.emit_all(emitter)
    }

    /// Decode a whole file into an emitter
    pub fn decode_file_into<E>(&self, path: &Path, emitter: &mut E) -> Result<DecodeSummary>
    where
        E: RowEmitter + ?Sized,
    {
        let stream = self.open_file(path)?;
        let summary = stream.emit_all(emitter)?;
        log::info!(
            "Decoded {} frames from {:?} ({})",
            summary.frames,
            path,
            summary.end
        );
        Ok(summary)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        let config = FormatConfig::default();
        let registry = CalibrationRegistry::from_table(config.calibration);
        Self { config, registry }
    }
}

/// Frames of one stream, with the header they were decoded against
pub struct FrameStream<R> {
    raw_header: RawHeader,
    header: CanonicalHeader,
    frames: FrameDecoder<R>,
}

impl<R: Read> FrameStream<R> {
    pub fn raw_header(&self) -> &RawHeader {
        &self.raw_header
    }

    pub fn header(&self) -> &CanonicalHeader {
        &self.header
    }

    pub fn schema(&self) -> &ChannelSchema {
        self.frames.schema()
    }

    /// Why decoding stopped, once it has
    pub fn end(&self) -> Option<&StreamEnd> {
        self.frames.end()
    }

    /// Drain the stream into an emitter
    pub fn emit_all<E>(mut self, emitter: &mut E) -> Result<DecodeSummary>
    where
        E: RowEmitter + ?Sized,
    {
        emitter.begin(self.schema())?;

        let mut rate = SampleRateEstimator::new(self.schema().position_of(TIME_CHANNEL));
        for frame in self.frames.by_ref() {
            rate.observe(&frame);
            emitter.emit(&frame)?;
        }

        emitter.finish()?;

        Ok(DecodeSummary {
            frames: self.frames.frames_emitted(),
            channels: self.frames.schema().len(),
            frame_width: self.frames.schema().frame_width(),
            end: self.frames.end().cloned().unwrap_or(StreamEnd::Clean),
            sample_rate_hz: rate.estimate(),
        })
    }
}

impl<R: Read> Iterator for FrameStream<R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        self.frames.next()
    }
}

/// Outcome of decoding one stream
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeSummary {
    /// Complete frames emitted
    pub frames: u64,
    /// Channels in the schema
    pub channels: usize,
    /// Bytes read per frame
    pub frame_width: usize,
    /// How the stream ended
    pub end: StreamEnd,
    /// Sample rate from the first two time stamps, if available
    pub sample_rate_hz: Option<u32>,
}

/// Estimates the logging rate from the first two time stamps
struct SampleRateEstimator {
    position: Option<usize>,
    first: Option<f64>,
    second: Option<f64>,
}

impl SampleRateEstimator {
    fn new(position: Option<usize>) -> Self {
        Self {
            position,
            first: None,
            second: None,
        }
    }

    fn observe(&mut self, frame: &Frame) {
        if self.second.is_some() {
            return;
        }
        let Some(value) = self.position.and_then(|p| frame.value(p)) else {
            return;
        };
        if self.first.is_none() {
            self.first = Some(value);
        } else {
            self.second = Some(value);
        }
    }

    fn estimate(&self) -> Option<u32> {
        let delta = self.second? - self.first?;
        if !(delta.is_finite() && delta > 0.0) {
            return None;
        }
        let rate = (1.0 / delta).round();
        (rate >= 1.0 && rate <= u32::MAX as f64).then_some(rate as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatRevision;
    use std::io::Cursor;

    fn v2_file(header: &str, frames: &[u8]) -> Vec<u8> {
        let mut bytes = (header.len() as u32 + 1).to_le_bytes().to_vec();
        bytes.extend_from_slice(header.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(frames);
        bytes
    }

    #[test]
    fn test_decoder_creation() {
        let decoder = Decoder::default();
        assert_eq!(decoder.config().revision, FormatRevision::V2);
        assert!(!decoder.registry().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = FormatConfig::default().with_explicit_widths(vec![]);
        assert!(matches!(
            Decoder::new(config),
            Err(DecoderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_decode_reader_exposes_header() {
        let decoder = Decoder::default();
        let bytes = v2_file("TS,TS1,TS2,TS3", &[]);
        let stream = decoder.decode_reader(Cursor::new(bytes)).unwrap();

        assert_eq!(stream.raw_header().text, "TS,TS1,TS2,TS3");
        assert_eq!(stream.header().names, vec!["TS"]);
        assert_eq!(stream.schema().channels()[0].byte_width, 4);
    }

    #[test]
    fn test_sample_rate_estimate() {
        let decoder = Decoder::default();
        // 4-byte TS in microseconds: 1000, 3000 -> 2 ms -> 500 Hz
        let mut frames = Vec::new();
        for ts in [1000u32, 3000, 5000] {
            frames.extend_from_slice(&ts.to_le_bytes());
        }
        let bytes = v2_file("TS,TS1,TS2,TS3", &frames);

        let mut rows: Vec<Frame> = Vec::new();
        let summary = decoder.decode_into(Cursor::new(bytes), &mut rows).unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.sample_rate_hz, Some(500));
        assert_eq!(summary.end, StreamEnd::Clean);
    }

    #[test]
    fn test_sample_rate_needs_two_frames() {
        let decoder = Decoder::default();
        let bytes = v2_file("TS,TS1,TS2,TS3", &1000u32.to_le_bytes());
        let mut rows: Vec<Frame> = Vec::new();
        let summary = decoder.decode_into(Cursor::new(bytes), &mut rows).unwrap();
        assert_eq!(summary.sample_rate_hz, None);
    }

    #[test]
    fn test_missing_file() {
        let decoder = Decoder::default();
        assert!(decoder.open_file(Path::new("nonexistent.benji2")).is_err());
    }
}
