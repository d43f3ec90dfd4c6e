//! Core types for the frame log decoder library
//!
//! This module defines the fundamental types the decoder emits when processing
//! log files. The decoder is stateless across files and only outputs decoded
//! frames - it does not aggregate, plot or serialize them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur during decoding
///
/// Only conditions that prevent decoding a file at all are errors. Running out
/// of bytes mid-frame is reported through [`StreamEnd`] instead.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Invalid channel schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Row emitter failed: {0}")]
    Emit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte order of the integer fields inside a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little"),
            ByteOrder::Big => write!(f, "big"),
        }
    }
}

/// Raw integer read from a frame field, before calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue {
    Unsigned(u64),
    Signed(i64),
}

impl RawValue {
    /// Convert the raw integer to f64 without any scaling
    pub fn as_f64(&self) -> f64 {
        match self {
            RawValue::Unsigned(v) => *v as f64,
            RawValue::Signed(v) => *v as f64,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Unsigned(v) => write!(f, "{}", v),
            RawValue::Signed(v) => write!(f, "{}", v),
        }
    }
}

/// One decoded row of the log
///
/// `values` is aligned with channel position: `values[i]` belongs to the
/// descriptor at position `i`. Slots after a sentinel channel stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 1-based sequence number assigned by the decoder (not read from the stream)
    pub index: u64,
    /// Physical values in channel position order
    pub values: Vec<Option<f64>>,
}

impl Frame {
    /// Value at a channel position, `None` if unset or out of range
    pub fn value(&self, position: usize) -> Option<f64> {
        self.values.get(position).copied().flatten()
    }

    /// Number of slots (equals the channel count of the schema)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Why a frame stream stopped producing frames
///
/// None of these are errors; they only differ in the diagnostics they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The stream ended exactly on a frame boundary
    Clean,
    /// The stream ended inside a frame; the partial frame was discarded
    Truncated {
        /// Channel whose field could not be filled
        channel: String,
        /// Bytes the field needed
        expected: usize,
        /// Bytes that were actually available
        available: usize,
    },
    /// A read failed for a reason other than end of stream
    ReadFailed(String),
}

impl fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamEnd::Clean => write!(f, "clean end of stream"),
            StreamEnd::Truncated {
                channel,
                expected,
                available,
            } => write!(
                f,
                "truncated frame at channel '{}' ({} of {} bytes)",
                channel, available, expected
            ),
            StreamEnd::ReadFailed(msg) => write!(f, "read failed: {}", msg),
        }
    }
}
