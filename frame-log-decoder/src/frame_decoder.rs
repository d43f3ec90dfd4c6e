//! Frame stream decoding
//!
//! Frames have no length prefix or terminator: a frame is one field per
//! channel, back to back, and its size is implied by the schema. The decoder
//! reads one field at a time and only emits a frame once every decodable
//! field was filled. A stream that ends inside a frame drops that frame.

use crate::schema::ChannelSchema;
use crate::types::{Frame, StreamEnd};
use std::io::{self, Read};
use std::iter::FusedIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Reading,
    Done,
}

/// Iterator of complete frames read from a byte stream
///
/// Once the stream runs out (cleanly or mid-frame) or a read fails, the
/// decoder stops for good and never touches the reader again.
pub struct FrameDecoder<R> {
    reader: R,
    schema: ChannelSchema,
    state: DecoderState,
    /// Index of the next emitted frame (1-based)
    next_index: u64,
    /// Scratch space for one field
    field: [u8; crate::schema::MAX_BYTE_WIDTH],
    end: Option<StreamEnd>,
}

impl<R: Read> FrameDecoder<R> {
    /// Create a decoder positioned at the first frame byte
    pub fn new(reader: R, schema: ChannelSchema) -> Self {
        Self {
            reader,
            schema,
            state: DecoderState::Reading,
            next_index: 1,
            field: [0; crate::schema::MAX_BYTE_WIDTH],
            end: None,
        }
    }

    /// Schema frames are decoded with
    pub fn schema(&self) -> &ChannelSchema {
        &self.schema
    }

    /// Why decoding stopped, once it has
    pub fn end(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.state == DecoderState::Done
    }

    /// Number of frames emitted so far
    pub fn frames_emitted(&self) -> u64 {
        self.next_index - 1
    }

    /// Give back the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn finish(&mut self, end: StreamEnd) {
        match &end {
            StreamEnd::Clean => log::debug!(
                "End of stream after {} frames",
                self.frames_emitted()
            ),
            StreamEnd::Truncated { .. } => log::warn!(
                "Discarding partial frame {}: {}",
                self.next_index,
                end
            ),
            StreamEnd::ReadFailed(_) => log::warn!(
                "Stopping after {} frames: {}",
                self.frames_emitted(),
                end
            ),
        }
        self.state = DecoderState::Done;
        self.end = Some(end);
    }

    fn read_frame(&mut self) -> Option<Frame> {
        let mut values = vec![None; self.schema.len()];
        let mut frame_bytes = 0usize;
        let mut stop = None;

        for channel in self.schema.channels() {
            if channel.is_sentinel() {
                log::trace!(
                    "Sentinel '{}' at position {}, ending frame {}",
                    channel.name,
                    channel.position,
                    self.next_index
                );
                break;
            }

            let field = &mut self.field[..channel.byte_width];
            match read_field(&mut self.reader, field) {
                Ok(filled) if filled == channel.byte_width => {
                    values[channel.position] = Some(channel.decode(field));
                    frame_bytes += filled;
                }
                Ok(filled) => {
                    stop = Some(if frame_bytes == 0 && filled == 0 {
                        StreamEnd::Clean
                    } else {
                        StreamEnd::Truncated {
                            channel: channel.name.clone(),
                            expected: channel.byte_width,
                            available: filled,
                        }
                    });
                    break;
                }
                Err(e) => {
                    stop = Some(StreamEnd::ReadFailed(e.to_string()));
                    break;
                }
            }
        }

        if let Some(end) = stop {
            self.finish(end);
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;
        log::trace!("Frame {} complete ({} bytes)", index, frame_bytes);

        Some(Frame { index, values })
    }
}

impl<R: Read> Iterator for FrameDecoder<R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            DecoderState::Reading => self.read_frame(),
            DecoderState::Done => None,
        }
    }
}

impl<R: Read> FusedIterator for FrameDecoder<R> {}

/// Fill `buf` from the reader, returning how many bytes were available
///
/// Unlike `read_exact`, a short read reports the count instead of an error so
/// truncation can be told apart from a clean end of stream.
fn read_field<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
