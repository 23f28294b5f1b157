//! Built-in chip registry
//!
//! The registry is an immutable table handed to whoever needs it; there is
//! no global mutable chip state.

use super::types::ChipDescriptor;

const MEGA_X8_FUSE_MASK: [u8; 4] = [0xFF, 0xFF, 0x07, 0x3F];

/// Fuses for the 328 family: external crystal, 2 KiB bootloader section,
/// BOD at 2.7 V, bootloader section write-protected.
const MEGA_328_FUSE_BITS: [u8; 4] = [0xFF, 0xDA, 0x05, 0x0F];

/// Fuses for the 168/88 family: external crystal, BOD at 2.7 V.
const MEGA_168_FUSE_BITS: [u8; 4] = [0xFF, 0xDD, 0x00, 0x0F];

/// Descriptors of every supported chip
///
/// The ATmega48 family is absent: its lock bits cannot protect a
/// bootloader section, so the lock step has nothing to program.
pub static CHIPS: &[ChipDescriptor] = &[
    ChipDescriptor::new(0x950F, "m328p", MEGA_X8_FUSE_MASK, MEGA_328_FUSE_BITS, 32768, 128),
    ChipDescriptor::new(0x9514, "m328", MEGA_X8_FUSE_MASK, MEGA_328_FUSE_BITS, 32768, 128),
    ChipDescriptor::new(0x940B, "m168pa", MEGA_X8_FUSE_MASK, MEGA_168_FUSE_BITS, 16384, 128),
    ChipDescriptor::new(0x9406, "m168", MEGA_X8_FUSE_MASK, MEGA_168_FUSE_BITS, 16384, 128),
    ChipDescriptor::new(0x930F, "m88pa", MEGA_X8_FUSE_MASK, MEGA_168_FUSE_BITS, 8192, 64),
    ChipDescriptor::new(0x930A, "m88a", MEGA_X8_FUSE_MASK, MEGA_168_FUSE_BITS, 8192, 64),
];

/// Lookup table of chip descriptors
#[derive(Debug, Clone, Copy)]
pub struct ChipRegistry<'a> {
    chips: &'a [ChipDescriptor],
}

impl ChipRegistry<'static> {
    /// The registry of built-in chips
    pub const fn builtin() -> Self {
        Self { chips: CHIPS }
    }
}

impl<'a> ChipRegistry<'a> {
    /// Create a registry over a custom descriptor table
    pub const fn new(chips: &'a [ChipDescriptor]) -> Self {
        Self { chips }
    }

    /// Number of chips in the registry
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Iterate over all descriptors
    pub fn iter(&self) -> impl Iterator<Item = &'a ChipDescriptor> {
        self.chips.iter()
    }

    /// Find a descriptor by signature
    pub fn find_by_signature(&self, signature: u16) -> Option<&'a ChipDescriptor> {
        self.chips.iter().find(|chip| chip.signature == signature)
    }

    /// Find a descriptor by name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&'a ChipDescriptor> {
        self.chips
            .iter()
            .find(|chip| chip.name.eq_ignore_ascii_case(name))
    }

    /// Descriptor for a signature, or [`ChipDescriptor::UNKNOWN`]
    pub fn resolve(&self, signature: u16) -> ChipDescriptor {
        self.find_by_signature(signature)
            .copied()
            .unwrap_or(ChipDescriptor::UNKNOWN)
    }
}

impl Default for ChipRegistry<'static> {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_geometry() {
        for chip in ChipRegistry::builtin().iter() {
            assert!(chip.is_well_formed(), "{} has invalid geometry", chip.name);
            assert!(!chip.is_unknown());
            assert!(chip.page_size as usize <= crate::flash::MAX_PAGE_SIZE);
        }
    }

    #[test]
    fn test_signatures_unique() {
        let registry = ChipRegistry::builtin();
        for chip in registry.iter() {
            assert_eq!(registry.find_by_signature(chip.signature), Some(chip));
        }
    }

    #[test]
    fn test_resolve() {
        let registry = ChipRegistry::builtin();
        let chip = registry.resolve(0x950F);
        assert_eq!(chip.name, "m328p");
        assert_eq!(chip.flash_size, 32768);
        assert_eq!(chip.page_size, 128);
        assert_eq!(chip.fuse_bits, [0xFF, 0xDA, 0x05, 0x0F]);

        assert_eq!(registry.resolve(0x930A).page_size, 64);
        assert!(registry.resolve(0x1234).is_unknown());
    }

    #[test]
    fn test_find_by_name() {
        let registry = ChipRegistry::builtin();
        assert_eq!(registry.find_by_name("M168PA").map(|c| c.signature), Some(0x940B));
        assert!(registry.find_by_name("m48").is_none());
    }

    #[test]
    fn test_custom_registry() {
        static ONE: [ChipDescriptor; 1] = [ChipDescriptor::new(
            0x9205,
            "m48a",
            [0xFF; 4],
            [0xFF; 4],
            4096,
            64,
        )];
        let registry = ChipRegistry::new(&ONE);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve(0x9205).name, "m48a");
        assert!(registry.resolve(0x950F).is_unknown());
    }
}
