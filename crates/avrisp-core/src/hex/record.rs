//! Borrowed HEX record

use core::fmt;

/// Intel HEX record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    /// Data bytes at a 16-bit address
    Data = 0x00,
    /// End of file
    EndOfFile = 0x01,
    /// Bits 4..19 of the address for following records
    ExtendedSegmentAddress = 0x02,
    /// CS:IP start address (80x86)
    StartSegmentAddress = 0x03,
    /// Upper 16 bits of the address for following records
    ExtendedLinearAddress = 0x04,
    /// 32-bit start address
    StartLinearAddress = 0x05,
}

impl RecordType {
    /// Parse a record type byte
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Data),
            0x01 => Some(Self::EndOfFile),
            0x02 => Some(Self::ExtendedSegmentAddress),
            0x03 => Some(Self::StartSegmentAddress),
            0x04 => Some(Self::ExtendedLinearAddress),
            0x05 => Some(Self::StartLinearAddress),
            _ => None,
        }
    }
}

/// One Intel HEX record referencing its data
///
/// Checksum invariant: `length + addr_hi + addr_lo + type + sum(data) +
/// checksum` is zero modulo 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexRecord<'a> {
    /// Declared data length
    pub length: u8,
    /// Load offset
    pub address: u16,
    /// Record type
    pub kind: RecordType,
    /// Data bytes
    pub data: &'a [u8],
    /// Two's complement checksum
    pub checksum: u8,
}

impl<'a> HexRecord<'a> {
    /// Create a record from its fields as stored
    pub const fn new(
        length: u8,
        address: u16,
        kind: RecordType,
        data: &'a [u8],
        checksum: u8,
    ) -> Self {
        Self {
            length,
            address,
            kind,
            data,
            checksum,
        }
    }

    /// Create a record with a computed length and checksum
    pub const fn with_checksum(address: u16, kind: RecordType, data: &'a [u8]) -> Self {
        let length = data.len() as u8;
        Self::new(
            length,
            address,
            kind,
            data,
            checksum(length, address, kind, data),
        )
    }

    /// Whether the stored checksum is correct
    pub const fn is_valid(&self) -> bool {
        self.data.len() == self.length as usize
            && checksum(self.length, self.address, self.kind, self.data) == self.checksum
    }

    /// One past the last address written by this record
    pub fn end_address(&self) -> u32 {
        self.address as u32 + self.data.len() as u32
    }
}

/// Checksum that makes a record sum to zero
pub const fn checksum(length: u8, address: u16, kind: RecordType, data: &[u8]) -> u8 {
    let mut sum = length
        .wrapping_add((address >> 8) as u8)
        .wrapping_add(address as u8)
        .wrapping_add(kind as u8);
    let mut i = 0;
    while i < data.len() {
        sum = sum.wrapping_add(data[i]);
        i += 1;
    }
    sum.wrapping_neg()
}

/// Formats the record as a HEX line without line terminator
impl fmt::Display for HexRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            ":{:02X}{:04X}{:02X}",
            self.length, self.address, self.kind as u8
        )?;
        for byte in self.data {
            write!(f, "{:02X}", byte)?;
        }
        write!(f, "{:02X}", self.checksum)
    }
}
