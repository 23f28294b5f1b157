//! Chip profiles for the encoder
//!
//! A profile carries the same facts as a [`ChipDescriptor`] but owns its
//! name, so it can come from a RON file as well as from the built-in
//! registry.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use avrisp_core::chip::{ChipDescriptor, ChipRegistry, Fuse};
use avrisp_core::flash::MAX_PAGE_SIZE;

use crate::error::{CodegenError, Result};

// ============================================================================
// Size types - makes RON files more readable
// ============================================================================

/// Size specification with human-readable units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
}

impl Size {
    /// Convert to bytes
    pub fn to_bytes(self) -> u32 {
        match self {
            Size::B(n) => n,
            Size::KiB(n) => n * 1024,
        }
    }
}

/// One byte per fuse, named for RON ergonomics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FusesDef {
    pub low: u8,
    pub high: u8,
    pub ext: u8,
    pub lock: u8,
}

impl FusesDef {
    /// Bytes indexed by [`Fuse`]
    pub fn to_array(self) -> [u8; 4] {
        let mut bytes = [0u8; 4];
        bytes[Fuse::Low as usize] = self.low;
        bytes[Fuse::High as usize] = self.high;
        bytes[Fuse::Ext as usize] = self.ext;
        bytes[Fuse::Lock as usize] = self.lock;
        bytes
    }

    fn from_array(bytes: [u8; 4]) -> Self {
        Self {
            low: bytes[Fuse::Low as usize],
            high: bytes[Fuse::High as usize],
            ext: bytes[Fuse::Ext as usize],
            lock: bytes[Fuse::Lock as usize],
        }
    }
}

fn default_fuse_mask() -> FusesDef {
    FusesDef {
        low: 0xFF,
        high: 0xFF,
        ext: 0xFF,
        lock: 0x3F,
    }
}

/// Chip profile in RON format
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChipProfile {
    /// Part name, e.g. "m328p"
    pub name: String,
    /// Low two signature bytes
    pub signature: u16,
    /// Total flash size
    pub flash_size: Size,
    /// Page size in bytes
    pub page_size: u16,
    /// Fuse values to program
    pub fuses: FusesDef,
    /// Significant fuse bits on read-back
    #[serde(default = "default_fuse_mask")]
    pub fuse_mask: FusesDef,
}

impl ChipProfile {
    /// Profile mirroring a registry descriptor
    pub fn from_descriptor(chip: &ChipDescriptor) -> Self {
        Self {
            name: chip.name.to_string(),
            signature: chip.signature,
            flash_size: Size::B(chip.flash_size),
            page_size: chip.page_size,
            fuses: FusesDef::from_array(chip.fuse_bits),
            fuse_mask: FusesDef::from_array(chip.fuse_mask),
        }
    }

    /// Parse and validate a profile from RON text
    pub fn from_ron(text: &str) -> Result<Self> {
        let profile: ChipProfile = ron::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Look up a built-in chip by name, or load `chip` as a `.ron` path
    pub fn resolve(chip: &str) -> Result<Self> {
        let path = Path::new(chip);
        if path.extension().is_some_and(|ext| ext == "ron") {
            return Self::load(path);
        }
        ChipRegistry::builtin()
            .find_by_name(chip)
            .map(Self::from_descriptor)
            .ok_or_else(|| CodegenError::UnknownChip(chip.to_string()))
    }

    /// Flash size in bytes
    pub fn flash_bytes(&self) -> u32 {
        self.flash_size.to_bytes()
    }

    /// Number of flash pages
    pub fn page_count(&self) -> u32 {
        self.flash_bytes() / self.page_size as u32
    }

    /// Validate the profile geometry and identity
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CodegenError::Validation("Chip has no name".to_string()));
        }
        if self.signature == 0x0000 || self.signature == 0xFFFF {
            return Err(CodegenError::Validation(format!(
                "Chip {} has invalid signature 0x{:04X}",
                self.name, self.signature
            )));
        }
        if self.page_size == 0 || self.page_size as usize > MAX_PAGE_SIZE || self.page_size % 2 != 0 {
            return Err(CodegenError::Validation(format!(
                "Chip {} has unsupported page size {}",
                self.name, self.page_size
            )));
        }
        let flash_size = self.flash_bytes();
        if flash_size == 0 || flash_size % self.page_size as u32 != 0 {
            return Err(CodegenError::Validation(format!(
                "Chip {} flash size {} is not a multiple of page size {}",
                self.name, flash_size, self.page_size
            )));
        }
        if flash_size > 0x1_0000 {
            return Err(CodegenError::Validation(format!(
                "Chip {} flash size {} exceeds the 64 KiB address range",
                self.name, flash_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
    (
        name: "m328p-int8",
        signature: 0x950F,
        flash_size: KiB(32),
        page_size: 128,
        fuses: (low: 0xE2, high: 0xDA, ext: 0x05, lock: 0x0F),
        fuse_mask: (low: 0xFF, high: 0xFF, ext: 0x07, lock: 0x3F),
    )
    "#;

    #[test]
    fn test_parse_profile() {
        let profile = ChipProfile::from_ron(PROFILE).unwrap();
        assert_eq!(profile.name, "m328p-int8");
        assert_eq!(profile.flash_bytes(), 32768);
        assert_eq!(profile.page_count(), 256);
        assert_eq!(profile.fuses.to_array(), [0xE2, 0xDA, 0x05, 0x0F]);
        assert_eq!(profile.fuse_mask.to_array(), [0xFF, 0xFF, 0x07, 0x3F]);
    }

    #[test]
    fn test_shipped_profile() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../chips/m328p-int8.ron");
        let shipped = ChipProfile::load(&path).unwrap();
        assert_eq!(shipped, ChipProfile::from_ron(PROFILE).unwrap());
    }

    #[test]
    fn test_default_mask() {
        let profile = ChipProfile::from_ron(
            "(name: \"x\", signature: 0x1234, flash_size: B(1024), page_size: 64,
              fuses: (low: 1, high: 2, ext: 3, lock: 4))",
        )
        .unwrap();
        assert_eq!(profile.fuse_mask, default_fuse_mask());
    }

    #[test]
    fn test_rejects_ragged_flash() {
        let err = ChipProfile::from_ron(
            "(name: \"x\", signature: 0x1234, flash_size: B(1000), page_size: 64,
              fuses: (low: 1, high: 2, ext: 3, lock: 4))",
        )
        .unwrap_err();
        assert!(matches!(err, CodegenError::Validation(_)));
    }

    #[test]
    fn test_from_registry() {
        let profile = ChipProfile::resolve("M168PA").unwrap();
        assert_eq!(profile.signature, 0x940B);
        assert_eq!(profile.flash_bytes(), 16384);
        assert_eq!(profile.fuses.to_array(), [0xFF, 0xDD, 0x00, 0x0F]);
        profile.validate().unwrap();

        assert!(matches!(
            ChipProfile::resolve("m2560"),
            Err(CodegenError::UnknownChip(_))
        ));
    }

    #[test]
    fn test_size_conversion() {
        assert_eq!(Size::B(256).to_bytes(), 256);
        assert_eq!(Size::KiB(16).to_bytes(), 16384);
    }
}
