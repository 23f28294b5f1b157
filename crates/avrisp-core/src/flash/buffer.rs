//! Fixed-capacity page buffer

use core::ops::{Deref, DerefMut};

use heapless::Vec;

use crate::error::{Error, Result};
use crate::image::ERASED;

/// Largest page size the buffer can hold
pub const MAX_PAGE_SIZE: usize = 256;

/// Scratch space for one flash page
///
/// Sized to a chip's page size on acquisition. Dropped, and thereby
/// released, when the owning operation returns on any path.
#[derive(Debug, Clone)]
pub struct PageBuffer {
    bytes: Vec<u8, MAX_PAGE_SIZE>,
}

impl PageBuffer {
    /// Acquire a buffer of `page_size` erased bytes
    ///
    /// Fails with `OutOfMemory` if `page_size` exceeds [`MAX_PAGE_SIZE`].
    pub fn acquire(page_size: u16) -> Result<Self> {
        let requested = page_size as usize;
        let mut bytes = Vec::new();
        bytes
            .resize(requested, ERASED)
            .map_err(|_| Error::OutOfMemory { requested })?;
        Ok(Self { bytes })
    }

    /// Whether every byte is 0xFF
    pub fn is_blank(&self) -> bool {
        is_blank(&self.bytes)
    }
}

impl Deref for PageBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for PageBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Whether a page is entirely erased
pub fn is_blank(page: &[u8]) -> bool {
    page.iter().all(|&b| b == ERASED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire() {
        let buffer = PageBuffer::acquire(128).unwrap();
        assert_eq!(buffer.len(), 128);
        assert!(buffer.is_blank());

        assert_eq!(PageBuffer::acquire(256).unwrap().len(), 256);
        assert_eq!(
            PageBuffer::acquire(512).unwrap_err(),
            Error::OutOfMemory { requested: 512 }
        );
    }

    #[test]
    fn test_is_blank() {
        let mut buffer = PageBuffer::acquire(4).unwrap();
        buffer[3] = 0xFE;
        assert!(!buffer.is_blank());
    }
}
