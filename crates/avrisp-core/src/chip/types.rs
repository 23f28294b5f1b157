//! Chip descriptor type definitions

use bitflags::bitflags;

/// One of the four configuration bytes of an AVR target
///
/// The discriminant is the index into [`ChipDescriptor::fuse_mask`] and
/// [`ChipDescriptor::fuse_bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fuse {
    /// Low fuse byte
    Low = 0,
    /// High fuse byte
    High = 1,
    /// Extended fuse byte
    Ext = 2,
    /// Lock bits
    Lock = 3,
}

impl Fuse {
    /// All fuses, in programming order
    pub const ALL: [Fuse; 4] = [Fuse::Low, Fuse::High, Fuse::Ext, Fuse::Lock];

    /// Index into the descriptor's fuse arrays
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Short human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            Fuse::Low => "low",
            Fuse::High => "high",
            Fuse::Ext => "extended",
            Fuse::Lock => "lock",
        }
    }

    /// The single-fuse set for this fuse
    pub const fn as_set(self) -> FuseSet {
        match self {
            Fuse::Low => FuseSet::LOW,
            Fuse::High => FuseSet::HIGH,
            Fuse::Ext => FuseSet::EXT,
            Fuse::Lock => FuseSet::LOCK,
        }
    }
}

bitflags! {
    /// A selection of fuses to program
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FuseSet: u8 {
        /// Low fuse byte
        const LOW  = 1 << 0;
        /// High fuse byte
        const HIGH = 1 << 1;
        /// Extended fuse byte
        const EXT  = 1 << 2;
        /// Lock bits
        const LOCK = 1 << 3;

        /// Everything programmed before flash: low, high and extended
        const PRE_LOCK = Self::LOW.bits() | Self::HIGH.bits() | Self::EXT.bits();
    }
}

impl FuseSet {
    /// Iterate over the selected fuses in programming order
    pub fn fuses(self) -> impl Iterator<Item = Fuse> {
        Fuse::ALL
            .into_iter()
            .filter(move |fuse| self.contains(fuse.as_set()))
    }
}

/// Static description of a programmable AVR chip
///
/// `signature` holds the two low bytes of the three-byte device signature
/// (the first byte is always the Atmel manufacturer code 0x1E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipDescriptor {
    /// Device signature (`sig1 << 8 | sig2`)
    pub signature: u16,
    /// Short part name, e.g. "m328p"
    pub name: &'static str,
    /// Bits of each fuse that are significant on read-back
    pub fuse_mask: [u8; 4],
    /// Fuse values to program, indexed by [`Fuse`]
    pub fuse_bits: [u8; 4],
    /// Flash size in bytes
    pub flash_size: u32,
    /// Flash page size in bytes
    pub page_size: u16,
}

impl ChipDescriptor {
    /// Sentinel returned when a signature is not in the registry
    pub const UNKNOWN: Self = Self {
        signature: 0x0000,
        name: "unknown",
        fuse_mask: [0xFF; 4],
        fuse_bits: [0xFF; 4],
        flash_size: 0,
        page_size: 0,
    };

    /// Create a new descriptor
    pub const fn new(
        signature: u16,
        name: &'static str,
        fuse_mask: [u8; 4],
        fuse_bits: [u8; 4],
        flash_size: u32,
        page_size: u16,
    ) -> Self {
        Self {
            signature,
            name,
            fuse_mask,
            fuse_bits,
            flash_size,
            page_size,
        }
    }

    /// Whether this is the [`UNKNOWN`](Self::UNKNOWN) sentinel
    pub const fn is_unknown(&self) -> bool {
        self.signature == 0
    }

    /// Flash geometry is usable: non-zero page size dividing the flash size
    pub const fn is_well_formed(&self) -> bool {
        self.page_size != 0 && self.flash_size % self.page_size as u32 == 0
    }

    /// Number of flash pages
    pub const fn page_count(&self) -> u32 {
        if self.page_size == 0 {
            0
        } else {
            self.flash_size / self.page_size as u32
        }
    }

    /// Mask of significant bits for a fuse
    pub const fn mask(&self, fuse: Fuse) -> u8 {
        self.fuse_mask[fuse as usize]
    }

    /// Value to program into a fuse
    pub const fn bits(&self, fuse: Fuse) -> u8 {
        self.fuse_bits[fuse as usize]
    }

    /// Whether a read-back value matches the programmed bits under the mask
    pub const fn fuse_matches(&self, fuse: Fuse, readback: u8) -> bool {
        readback & self.mask(fuse) == self.bits(fuse)
    }
}

impl core::fmt::Display for ChipDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (0x{:04X})", self.name, self.signature)
    }
}
