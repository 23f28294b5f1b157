//! Allocation-free HEX line decoder

use heapless::Vec;

use super::record::{HexRecord, RecordType};
use crate::error::{Error, Result};

/// Most data bytes a single record can carry
pub const MAX_RECORD_DATA: usize = 255;

/// Length, address, type and checksum bytes around the data
const RECORD_OVERHEAD: usize = 5;

/// A record decoded from text, owning its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// 1-based line number the record came from
    pub line: usize,
    /// Load offset
    pub address: u16,
    /// Record type
    pub kind: RecordType,
    /// Data bytes
    pub data: Vec<u8, MAX_RECORD_DATA>,
    /// Checksum as read
    pub checksum: u8,
}

impl DecodedRecord {
    /// Borrow as a [`HexRecord`]
    pub fn as_record(&self) -> HexRecord<'_> {
        HexRecord::new(
            self.data.len() as u8,
            self.address,
            self.kind,
            &self.data,
            self.checksum,
        )
    }

    /// Whether this is a non-zero extended address record
    fn moves_base(&self) -> bool {
        matches!(
            self.kind,
            RecordType::ExtendedSegmentAddress | RecordType::ExtendedLinearAddress
        ) && self.data.iter().any(|&b| b != 0)
    }
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Parse one `:LLAAAATT...CC` line
///
/// Surrounding whitespace (including a trailing `\r`) is ignored. Fails
/// with `MalformedRecord` on bad syntax or a length mismatch, and with
/// `ChecksumError` when the bytes do not sum to zero.
pub fn parse_line(text: &str, line: usize) -> Result<DecodedRecord> {
    let malformed = Error::MalformedRecord { line };

    let digits = text.trim().strip_prefix(':').ok_or(malformed)?.as_bytes();
    if digits.len() % 2 != 0 || digits.len() < RECORD_OVERHEAD * 2 {
        return Err(malformed);
    }

    let mut raw: Vec<u8, { MAX_RECORD_DATA + RECORD_OVERHEAD }> = Vec::new();
    for pair in digits.chunks_exact(2) {
        let high = nibble(pair[0]).ok_or(malformed)?;
        let low = nibble(pair[1]).ok_or(malformed)?;
        raw.push((high << 4) | low).map_err(|_| malformed)?;
    }

    let length = raw[0] as usize;
    if raw.len() != length + RECORD_OVERHEAD {
        return Err(malformed);
    }

    let sum = raw.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        return Err(Error::ChecksumError { line });
    }

    let kind = RecordType::from_u8(raw[3]).ok_or(malformed)?;
    let data = Vec::from_slice(&raw[4..4 + length]).map_err(|_| malformed)?;

    Ok(DecodedRecord {
        line,
        address: u16::from_be_bytes([raw[1], raw[2]]),
        kind,
        data,
        checksum: raw[4 + length],
    })
}

/// Iterator over the records of HEX text
///
/// Blank lines are skipped. The iterator ends after the end-of-file record
/// and after the first error; a record that fails its checksum is never
/// yielded. Extended address records that would move the base above zero
/// fail with `UnimplementedFormat`.
pub struct HexReader<'a> {
    lines: core::str::Lines<'a>,
    line: usize,
    done: bool,
}

impl<'a> HexReader<'a> {
    /// Create a reader over HEX text
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line: 0,
            done: false,
        }
    }

    /// Line number of the last line consumed
    pub fn line(&self) -> usize {
        self.line
    }
}

impl Iterator for HexReader<'_> {
    type Item = Result<DecodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        for text in self.lines.by_ref() {
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }

            let result = parse_line(text, self.line).and_then(|record| {
                if record.moves_base() {
                    Err(Error::UnimplementedFormat)
                } else {
                    Ok(record)
                }
            });
            match &result {
                Ok(record) if record.kind == RecordType::EndOfFile => self.done = true,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("hex: {}", e);
                    self.done = true;
                }
            }
            return Some(result);
        }

        self.done = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLINK: &str = ":100000000C9434000C943E000C943E000C943E0082\r\n\
                         :0400100011241FBEDA\r\n\
                         \r\n\
                         :00000001FF\r\n";

    #[test]
    fn test_parse_data_line() {
        let record = parse_line(":0400100011241FBEDA", 1).unwrap();
        assert_eq!(record.address, 0x0010);
        assert_eq!(record.kind, RecordType::Data);
        assert_eq!(&record.data[..], &[0x11, 0x24, 0x1F, 0xBE]);
        assert!(record.as_record().is_valid());
    }

    #[test]
    fn test_reader_crlf_and_blank_lines() {
        let records: std::vec::Vec<_> = HexReader::new(BLINK).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].line, 2);
        assert_eq!(records[2].kind, RecordType::EndOfFile);
        assert_eq!(records[2].line, 4);
    }

    #[test]
    fn test_stops_at_eof() {
        let text = ":00000001FF\n:0400100011241FBEDA\n";
        let mut reader = HexReader::new(text);
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_checksum_error_halts() {
        let text = ":100000000C9434000C943E000C943E000C943E0082\n\
                    :0400100011241FBEDB\n\
                    :00000001FF\n";
        let mut reader = HexReader::new(text);
        assert!(reader.next().unwrap().is_ok());
        assert_eq!(reader.next(), Some(Err(Error::ChecksumError { line: 2 })));
        assert_eq!(reader.next(), None);
    }

    #[test]
    fn test_malformed_lines() {
        for (text, line) in [
            ("0400100011241FBEDA", 7),
            (":0400100011241FBE", 7),
            (":0400100011241FBED", 7),
            (":04001000112G1FBEDA", 7),
            (":0600100011241FBEDA", 7),
            (":00000009F7", 7),
        ] {
            assert_eq!(
                parse_line(text, line),
                Err(Error::MalformedRecord { line }),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_extended_address() {
        let zero = ":020000040000FA\n:00000001FF\n";
        assert!(HexReader::new(zero).all(|r| r.is_ok()));

        let upper = ":020000040001F9\n";
        assert_eq!(
            HexReader::new(upper).next(),
            Some(Err(Error::UnimplementedFormat))
        );
    }
}
