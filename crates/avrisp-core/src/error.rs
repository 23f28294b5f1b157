//! Error types for avrisp-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Every variant belongs to one [`ErrorClass`] and maps
//! to a single status byte via [`Error::code`], which is what a standalone
//! programmer reports on its status LED / serial console.

use core::fmt;

use bitflags::bitflags;

use crate::chip::Fuse;

bitflags! {
    /// Status classes
    ///
    /// The class bits occupy the top of the status byte returned by
    /// [`Error::code`]; the low bits identify the failure within the class.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorClass: u8 {
        /// Session, signature, bus and data-format failures
        const GENERAL = 0x80;
        /// Fuse programming failures
        const FUSE    = 0x40;
        /// Flash programming and image layout failures
        const FLASH   = 0x20;
    }
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Session errors
    /// Target never answered the programming-enable instruction
    SyncError,
    /// A programming command was issued outside an active session
    NotActive,
    /// Target stayed busy longer than the configured poll limit
    BusyTimeout,
    /// The bus transport failed to exchange bytes
    Transport,

    // Chip errors
    /// Signature read back as 0x0000 or 0xFFFF
    InvalidSignature {
        /// Signature as read
        signature: u16,
    },
    /// Signature does not match the descriptor being programmed
    SignatureMismatch {
        /// Signature of the descriptor
        expected: u16,
        /// Signature read from the target
        found: u16,
    },
    /// Descriptor has a zero page size or a flash size that is not a
    /// multiple of it
    InvalidDescriptor,

    // Resource errors
    /// The page buffer could not hold the requested page size
    OutOfMemory {
        /// Requested page size in bytes
        requested: usize,
    },

    // Fuse errors
    /// Fuse read-back did not match the descriptor under its mask
    FuseVerifyError {
        /// Fuse that failed
        fuse: Fuse,
        /// Masked value that was expected
        expected: u8,
        /// Masked value that was read back
        read: u8,
    },

    // Flash errors
    /// The commit instruction did not echo the page's word address
    CommitError {
        /// Byte address of the page being committed
        address: u32,
    },
    /// A byte read back after commit differs from the byte written
    FlashVerifyError {
        /// Byte address of the mismatch
        address: u32,
        /// Byte that was written
        written: u8,
        /// Byte that was read back
        read: u8,
    },
    /// A paged image was built for a different page size
    PageSizeMismatch {
        /// Page size of the image
        image: u16,
        /// Page size requested by the programmer
        chip: u16,
    },
    /// Image content extends beyond the chip's flash
    ImageTooLarge {
        /// End address (exclusive) of the image
        end: u32,
        /// Flash size of the chip
        flash_size: u32,
    },

    // Data format errors
    /// A HEX record failed its checksum
    ChecksumError {
        /// 1-based line number of the record
        line: usize,
    },
    /// A HEX line could not be parsed as a record
    MalformedRecord {
        /// 1-based line number of the record
        line: usize,
    },
    /// The data uses a feature that is not supported, such as extended
    /// address records with a non-zero base
    UnimplementedFormat,
}

impl Error {
    /// Status class of this error
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::FuseVerifyError { .. } => ErrorClass::FUSE,
            Self::CommitError { .. }
            | Self::FlashVerifyError { .. }
            | Self::PageSizeMismatch { .. }
            | Self::ImageTooLarge { .. } => ErrorClass::FLASH,
            _ => ErrorClass::GENERAL,
        }
    }

    /// Status byte: the class bits ORed with a per-failure code
    pub const fn code(&self) -> u8 {
        let detail = match self {
            Self::SyncError => 0x01,
            Self::InvalidSignature { .. } => 0x02,
            Self::SignatureMismatch { .. } => 0x04,
            Self::OutOfMemory { .. } => 0x08,
            Self::UnimplementedFormat => 0x10,
            Self::NotActive => 0x03,
            Self::BusyTimeout => 0x05,
            Self::Transport => 0x06,
            Self::InvalidDescriptor => 0x07,
            Self::ChecksumError { .. } => 0x09,
            Self::MalformedRecord { .. } => 0x0A,
            Self::FuseVerifyError { fuse, .. } => 1 << fuse.index(),
            Self::PageSizeMismatch { .. } | Self::ImageTooLarge { .. } => 0x01,
            Self::CommitError { .. } => 0x02,
            Self::FlashVerifyError { .. } => 0x04,
        };
        self.class().bits() | detail
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncError => write!(f, "target not in sync (no programming-enable echo)"),
            Self::NotActive => write!(f, "no active programming session"),
            Self::BusyTimeout => write!(f, "target stayed busy"),
            Self::Transport => write!(f, "bus transfer failed"),
            Self::InvalidSignature { signature } => {
                write!(f, "invalid device signature 0x{:04X}", signature)
            }
            Self::SignatureMismatch { expected, found } => write!(
                f,
                "signature mismatch: expected 0x{:04X}, found 0x{:04X}",
                expected, found
            ),
            Self::InvalidDescriptor => write!(f, "invalid chip descriptor geometry"),
            Self::OutOfMemory { requested } => {
                write!(f, "cannot allocate a {} byte page buffer", requested)
            }
            Self::FuseVerifyError {
                fuse,
                expected,
                read,
            } => write!(
                f,
                "{} fuse verify failed: expected 0x{:02X}, read 0x{:02X}",
                fuse.name(),
                expected,
                read
            ),
            Self::CommitError { address } => {
                write!(f, "page commit at 0x{:04X} was not acknowledged", address)
            }
            Self::FlashVerifyError {
                address,
                written,
                read,
            } => write!(
                f,
                "flash verify failed at 0x{:04X}: wrote 0x{:02X}, read 0x{:02X}",
                address, written, read
            ),
            Self::PageSizeMismatch { image, chip } => write!(
                f,
                "image page size {} does not match chip page size {}",
                image, chip
            ),
            Self::ImageTooLarge { end, flash_size } => write!(
                f,
                "image ends at 0x{:X}, beyond the {} byte flash",
                end, flash_size
            ),
            Self::ChecksumError { line } => write!(f, "line {}: record checksum mismatch", line),
            Self::MalformedRecord { line } => write!(f, "line {}: malformed record", line),
            Self::UnimplementedFormat => write!(f, "unsupported record format"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
