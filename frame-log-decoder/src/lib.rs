//! Frame Log Decoder Library
//!
//! A reusable library for decoding self-describing binary telemetry logs into
//! engineering-unit sample rows.
//!
//! # Architecture
//!
//! Data flows one way, and nothing feeds back into an earlier stage:
//! - Header resolution: length-prefixed, comma-separated channel names are
//!   folded into canonical names with repetition counts
//! - Schema building: names, byte widths and the calibration registry become
//!   ordered channel descriptors
//! - Frame decoding: fixed-schema frames are read field by field and
//!   calibrated into physical values
//! - Row emission: each complete frame is handed to a [`RowEmitter`]
//!
//! The library does NOT:
//! - Discover files or schedule batches
//! - Write CSV or any other output format
//! - Parse command-line arguments or environment variables
//!
//! All of that lives in the application layer (frame-log-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use frame_log_decoder::{Decoder, FormatConfig, FormatRevision, Frame};
//! use std::path::Path;
//!
//! let config = FormatConfig::for_revision(FormatRevision::V2);
//! let decoder = Decoder::new(config).unwrap();
//!
//! let mut rows: Vec<Frame> = Vec::new();
//! let summary = decoder
//!     .decode_file_into(Path::new("data24_12.benji2"), &mut rows)
//!     .unwrap();
//!
//! println!("{} frames, {:?} Hz", summary.frames, summary.sample_rate_hz);
//! ```

// Public modules
pub mod calibration;
pub mod config;
pub mod decoder;
pub mod emitter;
pub mod frame_decoder;
pub mod header;
pub mod schema;
pub mod types;

// Re-export main types for convenience
pub use calibration::{
    Calibration, CalibrationFunction, CalibrationRegistry, CalibrationTable, ConversionRule,
};
pub use config::{ChannelLayout, FormatConfig, FormatRevision, SENTINEL_CHANNEL};
pub use decoder::{DecodeSummary, Decoder, FrameStream, TIME_CHANNEL};
pub use emitter::RowEmitter;
pub use frame_decoder::FrameDecoder;
pub use header::{resolve_header, CanonicalHeader, RawHeader};
pub use schema::{ChannelDescriptor, ChannelKind, ChannelSchema};
pub use types::{ByteOrder, DecoderError, Frame, RawValue, Result, StreamEnd};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: ensure we can create a decoder
        let decoder = Decoder::default();
        assert_eq!(decoder.config().sentinel.as_deref(), Some(SENTINEL_CHANNEL));
        assert!(!VERSION.is_empty());
    }
}
