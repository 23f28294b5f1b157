//! Linear byte-array image

use super::{overlay, ERASED};

/// Image stored as one linear byte array
///
/// The array starts at `base_address` and normally has its trailing run of
/// 0xFF bytes removed; anything past the end reads as erased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContiguousImage<'a> {
    /// Image name
    pub name: &'a str,
    /// Flash address of `data[0]`
    pub base_address: u32,
    /// Image bytes
    pub data: &'a [u8],
}

impl<'a> ContiguousImage<'a> {
    /// Create a new contiguous image
    pub const fn new(name: &'a str, base_address: u32, data: &'a [u8]) -> Self {
        Self {
            name,
            base_address,
            data,
        }
    }

    /// One past the last byte of the image
    pub fn end_address(&self) -> u32 {
        self.base_address + self.data.len() as u32
    }

    /// Materialize one page
    pub fn read_page(&self, address: u32, page: &mut [u8]) {
        page.fill(ERASED);
        overlay(page, address, self.base_address, self.data);
    }
}
