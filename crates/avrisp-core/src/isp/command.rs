//! ISP instruction encoding

use super::opcodes;
use crate::chip::Fuse;

/// A 4-byte serial programming instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IspCommand {
    /// Raw instruction bytes, sent first to last
    pub bytes: [u8; 4],
}

impl IspCommand {
    /// Build an instruction from raw bytes
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self {
            bytes: [a, b, c, d],
        }
    }

    /// Programming enable (`AC 53 00 00`)
    pub const fn programming_enable() -> Self {
        Self::new(opcodes::PROGRAMMING, opcodes::PROGRAMMING_ENABLE, 0, 0)
    }

    /// Chip erase (`AC 80 00 00`)
    pub const fn chip_erase() -> Self {
        Self::new(opcodes::PROGRAMMING, opcodes::CHIP_ERASE, 0, 0)
    }

    /// Poll RDY/BSY (`F0 00 00 00`)
    pub const fn poll_ready() -> Self {
        Self::new(opcodes::POLL_READY, 0, 0, 0)
    }

    /// Read one signature byte (`30 00 idx 00`)
    pub const fn read_signature(index: u8) -> Self {
        Self::new(opcodes::READ_SIGNATURE, 0, index, 0)
    }

    /// Write a fuse or the lock bits (`AC xx 00 value`)
    pub const fn write_fuse(fuse: Fuse, value: u8) -> Self {
        let op = match fuse {
            Fuse::Low => opcodes::WRITE_FUSE_LOW,
            Fuse::High => opcodes::WRITE_FUSE_HIGH,
            Fuse::Ext => opcodes::WRITE_FUSE_EXT,
            Fuse::Lock => opcodes::WRITE_LOCK,
        };
        Self::new(opcodes::PROGRAMMING, op, 0, value)
    }

    /// Read a fuse or the lock bits
    pub const fn read_fuse(fuse: Fuse) -> Self {
        let [a, b] = match fuse {
            Fuse::Low => opcodes::READ_FUSE_LOW,
            Fuse::High => opcodes::READ_FUSE_HIGH,
            Fuse::Ext => opcodes::READ_FUSE_EXT,
            Fuse::Lock => opcodes::READ_LOCK,
        };
        Self::new(a, b, 0, 0)
    }

    /// Load one byte of a word into the page buffer
    ///
    /// `word` is the word offset within the page.
    pub const fn load_page(word: u16, high: bool, value: u8) -> Self {
        let op = if high {
            opcodes::LOAD_PAGE_HIGH
        } else {
            opcodes::LOAD_PAGE_LOW
        };
        Self::new(op, (word >> 8) as u8, word as u8, value)
    }

    /// Commit the page buffer at a word address (`4C hi lo 00`)
    pub const fn write_page(word_address: u16) -> Self {
        Self::new(
            opcodes::WRITE_PAGE,
            (word_address >> 8) as u8,
            word_address as u8,
            0,
        )
    }

    /// Read one flash byte
    ///
    /// Flash is word organised: an even byte address is the low byte of word
    /// `address >> 1` and uses `0x20`; an odd one is the high byte and uses
    /// `0x28`.
    pub const fn read_flash(address: u32) -> Self {
        let op = if address & 1 == 0 {
            opcodes::READ_FLASH_LOW
        } else {
            opcodes::READ_FLASH_HIGH
        };
        let word = address >> 1;
        Self::new(op, (word >> 8) as u8, word as u8, 0)
    }
}

/// The three trailing bytes clocked back during an instruction
///
/// Byte 0 of the exchange is shifted out before the target has decoded
/// anything and carries no information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Response(pub u32);

impl Response {
    /// Compose a response from the raw 4-byte exchange
    pub const fn from_bytes(raw: [u8; 4]) -> Self {
        Self(((raw[1] as u32) << 16) | ((raw[2] as u32) << 8) | raw[3] as u32)
    }

    /// Second byte clocked in
    pub const fn r2(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Third byte clocked in; echoes the instruction's second byte
    pub const fn r3(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Fourth byte clocked in; the data byte of read instructions
    pub const fn r4(self) -> u8 {
        self.0 as u8
    }

    /// Low 16 bits (`r3 << 8 | r4`)
    pub const fn low_word(self) -> u16 {
        self.0 as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_flash_parity() {
        assert_eq!(IspCommand::read_flash(0x0000).bytes, [0x20, 0x00, 0x00, 0x00]);
        assert_eq!(IspCommand::read_flash(0x0001).bytes, [0x28, 0x00, 0x00, 0x00]);
        assert_eq!(IspCommand::read_flash(0x0202).bytes, [0x20, 0x01, 0x01, 0x00]);
        assert_eq!(IspCommand::read_flash(0x7FFF).bytes, [0x28, 0x3F, 0xFF, 0x00]);
    }

    #[test]
    fn test_fuse_commands() {
        assert_eq!(IspCommand::write_fuse(Fuse::High, 0xDA).bytes, [0xAC, 0xA8, 0x00, 0xDA]);
        assert_eq!(IspCommand::write_fuse(Fuse::Lock, 0x0F).bytes, [0xAC, 0xE0, 0x00, 0x0F]);
        assert_eq!(IspCommand::read_fuse(Fuse::High).bytes, [0x58, 0x08, 0x00, 0x00]);
        assert_eq!(IspCommand::read_fuse(Fuse::Ext).bytes, [0x50, 0x08, 0x00, 0x00]);
    }

    #[test]
    fn test_page_commands() {
        assert_eq!(IspCommand::load_page(0x3F, true, 0x12).bytes, [0x48, 0x00, 0x3F, 0x12]);
        assert_eq!(IspCommand::write_page(0x0140).bytes, [0x4C, 0x01, 0x40, 0x00]);
    }

    #[test]
    fn test_response_fields() {
        let response = Response::from_bytes([0xFF, 0xAC, 0x53, 0x00]);
        assert_eq!(response.0, 0x00AC_5300);
        assert_eq!(response.r3(), 0x53);
        assert_eq!(response.low_word(), 0x5300);
    }
}
