//! Image built directly from Intel HEX records

use super::{overlay, ERASED};
use crate::error::{Error, Result};
use crate::hex::{HexRecord, RecordType};

/// Image stored as the ordered records of an Intel HEX file
///
/// Data records are merged into each page on demand; an end-of-file record
/// stops the scan. Later records overwrite earlier ones where they overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexLineImage<'a> {
    /// Image name
    pub name: &'a str,
    /// Records in file order
    pub records: &'a [HexRecord<'a>],
}

impl<'a> HexLineImage<'a> {
    /// Create a new record image
    pub const fn new(name: &'a str, records: &'a [HexRecord<'a>]) -> Self {
        Self { name, records }
    }

    fn data_records(&self) -> impl Iterator<Item = &HexRecord<'a>> {
        self.records
            .iter()
            .take_while(|record| record.kind != RecordType::EndOfFile)
            .filter(|record| record.kind == RecordType::Data)
    }

    /// Lowest data address, or 0 for an image without data
    pub fn base_address(&self) -> u32 {
        self.data_records()
            .map(|record| record.address as u32)
            .min()
            .unwrap_or(0)
    }

    /// One past the highest data address
    pub fn end_address(&self) -> u32 {
        self.data_records()
            .map(HexRecord::end_address)
            .max()
            .unwrap_or(0)
    }

    /// Materialize one page
    ///
    /// Fails with `UnimplementedFormat` on an extended address record that
    /// moves the base away from zero.
    pub fn read_page(&self, address: u32, page: &mut [u8]) -> Result<()> {
        page.fill(ERASED);
        for record in self.records {
            match record.kind {
                RecordType::Data => {
                    overlay(page, address, record.address as u32, record.data)
                }
                RecordType::EndOfFile => break,
                RecordType::ExtendedSegmentAddress | RecordType::ExtendedLinearAddress => {
                    if record.data.iter().any(|&b| b != 0) {
                        return Err(Error::UnimplementedFormat);
                    }
                }
                RecordType::StartSegmentAddress | RecordType::StartLinearAddress => {}
            }
        }
        Ok(())
    }
}
