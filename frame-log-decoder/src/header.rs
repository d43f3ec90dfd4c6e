//! Channel header reading and resolution
//!
//! A log file starts with a 4-byte little-endian length prefix followed by a
//! comma-separated list of channel names. Hardware that logs several bytes or
//! several units under one logical name emits numbered variants of that name
//! (`TS,TS1,TS2,TS3`), and fixed-width name fields may be padded with NULs.
//!
//! [`resolve_header`] reduces the token list to canonical base names plus a
//! repetition count per name. The raw tokens are kept alongside, since some
//! layouts decode every raw token as its own frame field.

use crate::config::FormatConfig;
use crate::types::{DecoderError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::{self, Read};

/// Uninterpreted header region of a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// Header byte length (length prefix minus the revision's offset)
    pub length: usize,
    /// UTF-8 decoded header payload
    pub text: String,
}

/// Header after duplicate/enumerated names were folded together
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanonicalHeader {
    /// Every token, whitespace and NUL stripped, in file order
    pub tokens: Vec<String>,
    /// Distinct base names in first-occurrence order
    pub names: Vec<String>,
    /// Number of tokens that resolved to each base name
    pub repeat_counts: HashMap<String, usize>,
}

impl CanonicalHeader {
    /// Repetition count of a base name
    pub fn repeat_count(&self, name: &str) -> Option<usize> {
        self.repeat_counts.get(name).copied()
    }

    /// Canonical names paired with their counts, in order
    pub fn counted_names(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.names.iter().map(move |name| {
            let count = self.repeat_counts.get(name).copied().unwrap_or(1);
            (name.as_str(), count)
        })
    }
}

/// Strip surrounding whitespace and NUL padding from a header token
pub fn strip_token(token: &str) -> &str {
    token.trim().trim_matches('\0').trim()
}

/// Base name of a stripped token: trailing ASCII digits removed
pub fn base_name(token: &str) -> &str {
    token.trim_end_matches(|c: char| c.is_ascii_digit()).trim()
}

/// Fold a raw header string into canonical names and repetition counts
pub fn resolve_header(text: &str) -> CanonicalHeader {
    let mut header = CanonicalHeader::default();

    for token in text.split(',') {
        let token = strip_token(token);
        let base = base_name(token);

        match header.repeat_counts.get_mut(base) {
            Some(count) => *count += 1,
            None => {
                header.names.push(base.to_string());
                header.repeat_counts.insert(base.to_string(), 1);
            }
        }

        header.tokens.push(token.to_string());
    }

    log::debug!(
        "Resolved {} header tokens into {} canonical names",
        header.tokens.len(),
        header.names.len()
    );

    header
}

/// Read the length prefix, header text and alignment bytes from a stream
///
/// On success the reader is positioned at the first frame.
pub fn read_raw_header<R: Read>(reader: &mut R, config: &FormatConfig) -> Result<RawHeader> {
    let prefix = reader.read_u32::<LittleEndian>().map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            DecoderError::MalformedHeader("Missing header length prefix".to_string())
        }
        _ => DecoderError::Io(e),
    })?;

    let length = i64::from(prefix) - i64::from(config.header_offset);
    if length <= 0 {
        return Err(DecoderError::MalformedHeader(format!(
            "Header length {} (prefix {}, offset {}) is not positive",
            length, prefix, config.header_offset
        )));
    }
    let length = length as usize;

    // take() keeps a corrupt prefix from allocating gigabytes up front
    let mut bytes = Vec::new();
    reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
    if bytes.len() < length {
        return Err(DecoderError::MalformedHeader(format!(
            "Header truncated: expected {} bytes, found {}",
            length,
            bytes.len()
        )));
    }

    let text = String::from_utf8(bytes)
        .map_err(|e| DecoderError::MalformedHeader(format!("Header is not UTF-8: {}", e)))?;

    // Alignment bytes belong to the frame region: running short or failing
    // here only ends the frame stream, it never rejects the header
    match io::copy(
        &mut reader.by_ref().take(config.alignment_skip as u64),
        &mut io::sink(),
    ) {
        Ok(skipped) if skipped < config.alignment_skip as u64 => log::warn!(
            "Stream ended inside alignment bytes ({} of {})",
            skipped,
            config.alignment_skip
        ),
        Ok(_) => {}
        Err(e) => log::warn!("Failed to skip alignment bytes: {}", e),
    }

    log::debug!("Read {}-byte header", length);
    Ok(RawHeader { length, text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatRevision;
    use std::io::Cursor;

    fn encode(text: &str, offset: u32, skip: usize) -> Vec<u8> {
        let mut bytes = (text.len() as u32 + offset).to_le_bytes().to_vec();
        bytes.extend_from_slice(text.as_bytes());
        bytes.extend(std::iter::repeat(0u8).take(skip));
        bytes
    }

    #[test]
    fn test_repeated_name_counts() {
        let header = resolve_header("BATTERY,BATTERY,BATTERY");
        assert_eq!(header.names, vec!["BATTERY"]);
        assert_eq!(header.repeat_count("BATTERY"), Some(3));
        assert_eq!(header.repeat_counts.len(), header.names.len());
    }

    #[test]
    fn test_enumerated_names() {
        let header = resolve_header("TS,TS1,TS2,TS3,CURRENT,CURRENT1");
        assert_eq!(header.names, vec!["TS", "CURRENT"]);
        assert_eq!(header.repeat_count("TS"), Some(4));
        assert_eq!(header.repeat_count("CURRENT"), Some(2));
        assert_eq!(header.tokens.len(), 6);
        assert_eq!(header.tokens[1], "TS1");
    }

    #[test]
    fn test_first_occurrence_order() {
        let header = resolve_header("B,A,B1,C,A1");
        assert_eq!(header.names, vec!["B", "A", "C"]);
        let counted: Vec<_> = header.counted_names().collect();
        assert_eq!(counted, vec![("B", 2), ("A", 2), ("C", 1)]);
    }

    #[test]
    fn test_nul_padding_is_stripped() {
        let padded = resolve_header("TS\0\0, CURRENT \0");
        let plain = resolve_header("TS,CURRENT");
        assert_eq!(padded.names, plain.names);
        assert_eq!(padded.tokens, plain.tokens);
    }

    #[test]
    fn test_empty_token_is_counted() {
        let header = resolve_header("TS,\0\0\0,,BATTERY");
        assert_eq!(header.names, vec!["TS", "", "BATTERY"]);
        assert_eq!(header.repeat_count(""), Some(2));
    }

    #[test]
    fn test_digits_only_token() {
        assert_eq!(base_name("123"), "");
        assert_eq!(base_name("GPS_0_"), "GPS_0_");
        assert_eq!(base_name("CH 2"), "CH");
    }

    #[test]
    fn test_read_raw_header_v2() {
        let config = FormatConfig::for_revision(FormatRevision::V2);
        let mut bytes = encode("TS,CURRENT", 1, 1);
        bytes.push(0xAB);

        let mut cursor = Cursor::new(bytes);
        let header = read_raw_header(&mut cursor, &config).unwrap();
        assert_eq!(header.text, "TS,CURRENT");
        assert_eq!(header.length, 10);

        // Positioned on the first frame byte
        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, vec![0xAB]);
    }

    #[test]
    fn test_read_raw_header_v1_offsets() {
        let config = FormatConfig::for_revision(FormatRevision::V1);
        let mut cursor = Cursor::new(encode("TS,TS1", 2, 2));
        let header = read_raw_header(&mut cursor, &config).unwrap();
        assert_eq!(header.text, "TS,TS1");
    }

    #[test]
    fn test_empty_stream_is_malformed() {
        let config = FormatConfig::default();
        let result = read_raw_header(&mut Cursor::new(Vec::new()), &config);
        assert!(matches!(result, Err(DecoderError::MalformedHeader(_))));
    }

    #[test]
    fn test_non_positive_length_is_malformed() {
        let config = FormatConfig::for_revision(FormatRevision::V1);
        // prefix 2 minus offset 2 = 0
        let result = read_raw_header(&mut Cursor::new(2u32.to_le_bytes().to_vec()), &config);
        assert!(matches!(result, Err(DecoderError::MalformedHeader(_))));

        let result = read_raw_header(&mut Cursor::new(0u32.to_le_bytes().to_vec()), &config);
        assert!(matches!(result, Err(DecoderError::MalformedHeader(_))));
    }

    #[test]
    fn test_truncated_header_is_malformed() {
        let config = FormatConfig::default();
        let mut bytes = 50u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"TS,CUR");
        let result = read_raw_header(&mut Cursor::new(bytes), &config);
        assert!(matches!(result, Err(DecoderError::MalformedHeader(_))));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let config = FormatConfig::default();
        let mut bytes = 4u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFE, 0xFD]);
        let result = read_raw_header(&mut Cursor::new(bytes), &config);
        assert!(matches!(result, Err(DecoderError::MalformedHeader(_))));
    }

    /// Serves `data`, then fails every read
    struct BrokenAfter {
        data: Cursor<Vec<u8>>,
    }

    impl Read for BrokenAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "link dropped")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_alignment_failure_keeps_header() {
        let config = FormatConfig::for_revision(FormatRevision::V1);
        let mut reader = BrokenAfter {
            data: Cursor::new(encode("TS,TS1", 2, 0)),
        };

        let header = read_raw_header(&mut reader, &config).unwrap();
        assert_eq!(header.text, "TS,TS1");
    }

    #[test]
    fn test_short_alignment_keeps_header() {
        let config = FormatConfig::for_revision(FormatRevision::V1);
        let mut cursor = Cursor::new(encode("TS", 2, 1));
        let header = read_raw_header(&mut cursor, &config).unwrap();
        assert_eq!(header.text, "TS");
    }
}
