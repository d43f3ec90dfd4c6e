//! CSV output
//!
//! One row per frame: the frame index followed by every channel value in
//! schema order. Channels past a sentinel have no value and are left empty.

use frame_log_decoder::{ChannelSchema, DecoderError, Frame, RowEmitter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header of the index column
pub const INDEX_COLUMN: &str = "Index";

/// Writes decoded rows as CSV
pub struct CsvEmitter<W: Write> {
    writer: csv::Writer<W>,
    record: Vec<String>,
    rows: u64,
}

impl CsvEmitter<BufWriter<File>> {
    /// Create (or truncate) a CSV file
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvEmitter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            record: Vec::new(),
            rows: 0,
        }
    }

    /// Rows written so far (header excluded)
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W, DecoderError> {
        self.writer
            .into_inner()
            .map_err(|e| DecoderError::Emit(e.to_string()))
    }

    fn write_record(&mut self) -> Result<(), DecoderError> {
        self.writer
            .write_record(&self.record)
            .map_err(|e| DecoderError::Emit(e.to_string()))
    }
}

impl<W: Write> RowEmitter for CsvEmitter<W> {
    fn begin(&mut self, schema: &ChannelSchema) -> Result<(), DecoderError> {
        self.record.clear();
        self.record.push(INDEX_COLUMN.to_string());
        self.record.extend(schema.names().map(str::to_string));
        self.write_record()
    }

    fn emit(&mut self, frame: &Frame) -> Result<(), DecoderError> {
        self.record.clear();
        self.record.push(frame.index.to_string());
        self.record.extend(
            frame
                .values
                .iter()
                .map(|value| value.map(|v| v.to_string()).unwrap_or_default()),
        );
        self.write_record()?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DecoderError> {
        self.writer
            .flush()
            .map_err(|e| DecoderError::Emit(e.to_string()))
    }
}
