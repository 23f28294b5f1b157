//! Page-table image

use super::ERASED;
use crate::error::{Error, Result};

/// Image stored as a table of flash pages
///
/// `pages[i]` holds the page at byte address `i * page_size`; the table is
/// indexed from address zero regardless of `base_address`. `None` marks a
/// blank page. A page slice shorter than `page_size` is padded with 0xFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagedImage<'a> {
    /// Image name
    pub name: &'a str,
    /// Address of the first non-blank page
    pub base_address: u32,
    /// Page size the table was built for
    pub page_size: u16,
    /// Page table
    pub pages: &'a [Option<&'a [u8]>],
}

impl<'a> PagedImage<'a> {
    /// Create a new paged image
    pub const fn new(
        name: &'a str,
        base_address: u32,
        page_size: u16,
        pages: &'a [Option<&'a [u8]>],
    ) -> Self {
        Self {
            name,
            base_address,
            page_size,
            pages,
        }
    }

    /// One past the last byte covered by the page table
    pub fn end_address(&self) -> u32 {
        self.pages.len() as u32 * self.page_size as u32
    }

    /// Materialize one page
    ///
    /// Fails with `PageSizeMismatch` if `page.len()` is not the table's
    /// page size.
    pub fn read_page(&self, address: u32, page: &mut [u8]) -> Result<()> {
        if page.len() != self.page_size as usize {
            return Err(Error::PageSizeMismatch {
                image: self.page_size,
                chip: page.len() as u16,
            });
        }

        page.fill(ERASED);
        let index = (address / self.page_size as u32) as usize;
        if let Some(Some(data)) = self.pages.get(index) {
            let len = data.len().min(page.len());
            page[..len].copy_from_slice(&data[..len]);
        }
        Ok(())
    }
}
