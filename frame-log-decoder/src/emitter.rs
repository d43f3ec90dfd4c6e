//! Row emitter boundary
//!
//! Decoded frames are handed to a [`RowEmitter`] one at a time, in increasing
//! index order. What happens to them (CSV, a track-log writer, an in-memory
//! buffer) is up to the emitter.

use crate::schema::ChannelSchema;
use crate::types::{Frame, Result};

/// Receiver of decoded rows
pub trait RowEmitter {
    /// Called once with the file's schema before the first row
    fn begin(&mut self, _schema: &ChannelSchema) -> Result<()> {
        Ok(())
    }

    /// Called once per complete frame
    fn emit(&mut self, frame: &Frame) -> Result<()>;

    /// Called after the last row
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects every frame in memory
impl RowEmitter for Vec<Frame> {
    fn emit(&mut self, frame: &Frame) -> Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}

impl<E: RowEmitter + ?Sized> RowEmitter for &mut E {
    fn begin(&mut self, schema: &ChannelSchema) -> Result<()> {
        (**self).begin(schema)
    }

    fn emit(&mut self, frame: &Frame) -> Result<()> {
        (**self).emit(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive<E: RowEmitter>(mut emitter: E, frame: &Frame) {
        emitter.emit(frame).unwrap();
        emitter.finish().unwrap();
    }

    #[test]
    fn test_vec_collects_frames() {
        let mut rows: Vec<Frame> = Vec::new();
        let frame = Frame {
            index: 1,
            values: vec![Some(1.0), None],
        };

        drive(&mut rows, &frame);

        assert_eq!(rows, vec![frame]);
    }
}
