//! AVR serial programming instruction set
//!
//! Every instruction is four bytes. The first byte (and for the `AC` group
//! the second) selects the operation; the remaining bytes carry an address
//! and/or a data byte. Values are from the ATmega48A/88A/168A/328 family
//! datasheet, "Serial Programming Instruction Set".

// ============================================================================
// Programming mode
// ============================================================================

/// First byte of the programming enable / erase / fuse write group
pub const PROGRAMMING: u8 = 0xAC;
/// Second byte of programming enable; echoed back in byte 3 when in sync
pub const PROGRAMMING_ENABLE: u8 = 0x53;
/// Second byte of chip erase (flash, EEPROM and lock bits)
pub const CHIP_ERASE: u8 = 0x80;
/// Poll RDY/BSY; bit 0 of the data byte is set while busy
pub const POLL_READY: u8 = 0xF0;

// ============================================================================
// Identification
// ============================================================================

/// Read signature byte (byte index in the third byte)
pub const READ_SIGNATURE: u8 = 0x30;

// ============================================================================
// Fuses and lock bits
// ============================================================================

/// Second byte of write low fuse (after [`PROGRAMMING`])
pub const WRITE_FUSE_LOW: u8 = 0xA0;
/// Second byte of write high fuse
pub const WRITE_FUSE_HIGH: u8 = 0xA8;
/// Second byte of write extended fuse
pub const WRITE_FUSE_EXT: u8 = 0xA4;
/// Second byte of write lock bits
pub const WRITE_LOCK: u8 = 0xE0;

/// Read low fuse (`50 00`)
pub const READ_FUSE_LOW: [u8; 2] = [0x50, 0x00];
/// Read high fuse (`58 08`)
pub const READ_FUSE_HIGH: [u8; 2] = [0x58, 0x08];
/// Read extended fuse (`50 08`)
pub const READ_FUSE_EXT: [u8; 2] = [0x50, 0x08];
/// Read lock bits (`58 00`)
pub const READ_LOCK: [u8; 2] = [0x58, 0x00];

// ============================================================================
// Program memory
// ============================================================================

/// Load program memory page, low byte of the word
pub const LOAD_PAGE_LOW: u8 = 0x40;
/// Load program memory page, high byte of the word
pub const LOAD_PAGE_HIGH: u8 = 0x48;
/// Write the page buffer to flash at a word address
pub const WRITE_PAGE: u8 = 0x4C;
/// Read program memory, low byte of the word
pub const READ_FLASH_LOW: u8 = 0x20;
/// Read program memory, high byte of the word
pub const READ_FLASH_HIGH: u8 = 0x28;

/// Bit that turns a low-byte flash opcode into its high-byte counterpart
pub const HIGH_BYTE_BIT: u8 = 0x08;
