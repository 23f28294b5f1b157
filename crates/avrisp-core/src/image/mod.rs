//! Firmware image representations
//!
//! A firmware image is read-only data the programmer materializes one flash
//! page at a time. Three layouts are supported, trading source size against
//! lookup cost; all of them are `const`-constructible so generated images
//! can be compiled into a standalone programmer:
//!
//! - [`ContiguousImage`] - one byte array with the trailing 0xFF run dropped
//! - [`PagedImage`] - a page table where blank pages are `None`
//! - [`HexLineImage`] - the Intel HEX records themselves
//!
//! Bytes not covered by an image read as 0xFF, the erased state of flash.

mod contiguous;
mod hex_lines;
mod paged;

pub use contiguous::ContiguousImage;
pub use hex_lines::HexLineImage;
pub use paged::PagedImage;

use crate::chip::ChipDescriptor;
use crate::error::{Error, Result};

/// Value of an erased flash byte
pub const ERASED: u8 = 0xFF;

/// A firmware image in one of the supported layouts
#[derive(Debug, Clone, Copy)]
pub enum FirmwareImage<'a> {
    /// Linear byte array
    Contiguous(ContiguousImage<'a>),
    /// Sparse page table
    Paged(PagedImage<'a>),
    /// Raw Intel HEX records
    HexLines(HexLineImage<'a>),
}

impl<'a> FirmwareImage<'a> {
    /// Image name, for logs and generated identifiers
    pub fn name(&self) -> &'a str {
        match self {
            Self::Contiguous(image) => image.name,
            Self::Paged(image) => image.name,
            Self::HexLines(image) => image.name,
        }
    }

    /// Lowest address the image covers
    pub fn base_address(&self) -> u32 {
        match self {
            Self::Contiguous(image) => image.base_address,
            Self::Paged(image) => image.base_address,
            Self::HexLines(image) => image.base_address(),
        }
    }

    /// One past the highest address the image covers
    pub fn end_address(&self) -> u32 {
        match self {
            Self::Contiguous(image) => image.end_address(),
            Self::Paged(image) => image.end_address(),
            Self::HexLines(image) => image.end_address(),
        }
    }

    /// Materialize the page starting at `address` into `page`
    ///
    /// `page.len()` is the page size. Every byte of `page` is written;
    /// bytes the image does not cover are set to 0xFF.
    pub fn read_page(&self, address: u32, page: &mut [u8]) -> Result<()> {
        match self {
            Self::Contiguous(image) => {
                image.read_page(address, page);
                Ok(())
            }
            Self::Paged(image) => image.read_page(address, page),
            Self::HexLines(image) => image.read_page(address, page),
        }
    }

    /// Check that the image can be programmed into `chip`
    pub fn check_fits(&self, chip: &ChipDescriptor) -> Result<()> {
        if let Self::Paged(image) = self {
            if image.page_size != chip.page_size {
                return Err(Error::PageSizeMismatch {
                    image: image.page_size,
                    chip: chip.page_size,
                });
            }
        }

        let end = self.end_address();
        if end > chip.flash_size {
            return Err(Error::ImageTooLarge {
                end,
                flash_size: chip.flash_size,
            });
        }
        Ok(())
    }
}

/// Copy the part of `chunk` (starting at `chunk_address`) that falls inside
/// `page` (starting at `page_address`)
pub(crate) fn overlay(page: &mut [u8], page_address: u32, chunk_address: u32, chunk: &[u8]) {
    let page_start = page_address as u64;
    let page_end = page_start + page.len() as u64;
    let chunk_start = chunk_address as u64;
    let chunk_end = chunk_start + chunk.len() as u64;

    let start = page_start.max(chunk_start);
    let end = page_end.min(chunk_end);
    if start >= end {
        return;
    }

    let dst = (start - page_start) as usize..(end - page_start) as usize;
    let src = (start - chunk_start) as usize..(end - chunk_start) as usize;
    page[dst].copy_from_slice(&chunk[src]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::{HexRecord, RecordType};

    const CODE: [u8; 6] = [0x0C, 0x94, 0x34, 0x00, 0x0C, 0x94];

    #[test]
    fn test_overlay_partial() {
        let mut page = [ERASED; 4];
        overlay(&mut page, 4, 2, &CODE);
        assert_eq!(page, [0x34, 0x00, 0x0C, 0x94]);

        let mut page = [ERASED; 4];
        overlay(&mut page, 0, 2, &CODE);
        assert_eq!(page, [ERASED, ERASED, 0x0C, 0x94]);

        let mut page = [ERASED; 4];
        overlay(&mut page, 8, 2, &CODE);
        assert_eq!(page, [ERASED; 4]);
    }

    #[test]
    fn test_layouts_materialize_identically() {
        static PAGE0: [u8; 6] = CODE;
        static PAGES: [Option<&[u8]>; 1] = [Some(PAGE0.as_slice())];
        static RECORDS: [HexRecord<'static>; 2] = [
            HexRecord::new(6, 0x0000, RecordType::Data, &CODE, 0x86),
            HexRecord::new(0, 0x0000, RecordType::EndOfFile, &[], 0xFF),
        ];

        let images = [
            FirmwareImage::Contiguous(ContiguousImage::new("blink", 0, &CODE)),
            FirmwareImage::Paged(PagedImage::new("blink", 0, 8, &PAGES)),
            FirmwareImage::HexLines(HexLineImage::new("blink", &RECORDS)),
        ];

        for image in &images {
            for address in [0u32, 8, 64] {
                let mut page = [0u8; 8];
                image.read_page(address, &mut page).unwrap();
                let mut expected = [ERASED; 8];
                if address == 0 {
                    expected[..6].copy_from_slice(&CODE);
                }
                assert_eq!(page, expected, "{:?} at {}", image, address);
            }
            assert_eq!(image.base_address(), 0);
        }
    }

    #[test]
    fn test_check_fits() {
        let chip = ChipDescriptor::new(0x930F, "m88pa", [0xFF; 4], [0xFF; 4], 8192, 64);

        static DATA: [u8; 2] = [0x00, 0x00];
        let fits = FirmwareImage::Contiguous(ContiguousImage::new("a", 8190, &DATA));
        assert!(fits.check_fits(&chip).is_ok());

        let overflow = FirmwareImage::Contiguous(ContiguousImage::new("a", 8191, &DATA));
        assert_eq!(
            overflow.check_fits(&chip),
            Err(Error::ImageTooLarge {
                end: 8193,
                flash_size: 8192
            })
        );

        static PAGES: [Option<&[u8]>; 1] = [None];
        let paged = FirmwareImage::Paged(PagedImage::new("a", 0, 128, &PAGES));
        assert_eq!(
            paged.check_fits(&chip),
            Err(Error::PageSizeMismatch {
                image: 128,
                chip: 64
            })
        );
    }
}
