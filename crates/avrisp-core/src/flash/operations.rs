//! Flash write, verify and upload operations

use super::buffer::PageBuffer;
use crate::chip::{read_signature, ChipDescriptor};
use crate::error::{Error, Result};
use crate::fuse;
use crate::image::{FirmwareImage, ERASED};
use crate::programmer::{BusSpeed, IspBus};
use crate::protocol;
use crate::session::IspSession;

/// Callback for progress reporting during an upload
pub trait UploadProgress {
    /// Called before the chip erase
    fn erasing(&mut self);

    /// Called before the pre-lock fuses are programmed
    fn programming_fuses(&mut self);

    /// Called when starting the page loop
    fn writing(&mut self, total_pages: u32);

    /// Called after each page; `written` is false for a skipped blank page
    fn page_done(&mut self, address: u32, written: bool);

    /// Called before the lock bits are programmed
    fn locking(&mut self);

    /// Called when the upload is complete
    fn complete(&mut self, stats: &UploadStats);
}

/// Callback for progress reporting during read-back
pub trait ReadProgress {
    /// Called when starting to read pages
    fn reading(&mut self, total_pages: u32);

    /// Called after each page
    fn page_read(&mut self, address: u32);
}

/// A no-op progress reporter
pub struct NoProgress;

impl UploadProgress for NoProgress {
    fn erasing(&mut self) {}
    fn programming_fuses(&mut self) {}
    fn writing(&mut self, _total_pages: u32) {}
    fn page_done(&mut self, _address: u32, _written: bool) {}
    fn locking(&mut self) {}
    fn complete(&mut self, _stats: &UploadStats) {}
}

impl ReadProgress for NoProgress {
    fn reading(&mut self, _total_pages: u32) {}
    fn page_read(&mut self, _address: u32) {}
}

/// Statistics from an upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Pages written, committed and verified
    pub pages_written: u32,
    /// Blank pages left to the chip erase
    pub pages_skipped: u32,
}

/// Page addresses from the page containing `base` up to the end of flash
fn page_addresses(chip: &ChipDescriptor, base: u32) -> impl Iterator<Item = u32> {
    let page_size = chip.page_size as u32;
    let start = base / page_size * page_size;
    (start..chip.flash_size).step_by(page_size as usize)
}

fn page_count_from(chip: &ChipDescriptor, base: u32) -> u32 {
    let page_size = chip.page_size as u32;
    chip.flash_size.saturating_sub(base / page_size * page_size) / page_size
}

fn check_geometry(chip: &ChipDescriptor) -> Result<()> {
    if chip.is_well_formed() {
        Ok(())
    } else {
        Err(Error::InvalidDescriptor)
    }
}

/// Erase flash and lock bits
pub fn erase_chip<B: IspBus>(session: &mut IspSession<B>) -> Result<()> {
    let max_polls = session.config().busy_poll_limit;
    let bus = session.bus()?;
    bus.set_speed(BusSpeed::Slow);
    log::info!("avrisp: erasing chip");
    protocol::chip_erase(bus, max_polls)
}

/// Load one page into the target's page buffer and commit it
///
/// `page_address` is a byte address aligned to the page size. The commit
/// reply must echo the page's word address, otherwise this fails with
/// `CommitError`.
pub fn write_page<B: IspBus>(
    session: &mut IspSession<B>,
    page_address: u32,
    page: &[u8],
) -> Result<()> {
    let max_polls = session.config().busy_poll_limit;
    let bus = session.bus()?;
    bus.set_speed(BusSpeed::Fast);

    for (word, pair) in page.chunks(2).enumerate() {
        let word = word as u16;
        let high = pair.get(1).copied().unwrap_or(ERASED);
        protocol::load_page_byte(bus, word, false, pair[0], max_polls)?;
        protocol::load_page_byte(bus, word, true, high, max_polls)?;
    }

    let word_address = (page_address >> 1) as u16;
    let echo = protocol::write_page(bus, word_address)?;
    if echo != word_address {
        log::error!(
            "avrisp: commit at 0x{:04X} echoed 0x{:04X}",
            word_address,
            echo
        );
        return Err(Error::CommitError {
            address: page_address,
        });
    }
    protocol::wait_ready(bus, max_polls)
}

/// Read one page of flash
pub fn read_page<B: IspBus>(
    session: &mut IspSession<B>,
    page_address: u32,
    page: &mut [u8],
) -> Result<()> {
    let bus = session.bus()?;
    bus.set_speed(BusSpeed::Fast);
    for (offset, byte) in page.iter_mut().enumerate() {
        *byte = protocol::read_flash_byte(bus, page_address + offset as u32)?;
    }
    Ok(())
}

/// Re-read a page and compare it with what was written
///
/// Fails with `FlashVerifyError` at the first differing byte.
pub fn verify_page<B: IspBus>(
    session: &mut IspSession<B>,
    page_address: u32,
    page: &[u8],
) -> Result<()> {
    let bus = session.bus()?;
    bus.set_speed(BusSpeed::Fast);
    for (offset, &written) in page.iter().enumerate() {
        let address = page_address + offset as u32;
        let read = protocol::read_flash_byte(bus, address)?;
        if read != written {
            return Err(Error::FlashVerifyError {
                address,
                written,
                read,
            });
        }
    }
    Ok(())
}

/// Program an image into the target
///
/// Equivalent to [`upload_image_with_progress`] without progress reporting.
pub fn upload_image<B: IspBus>(
    session: &mut IspSession<B>,
    chip: &ChipDescriptor,
    image: &FirmwareImage<'_>,
) -> Result<UploadStats> {
    upload_image_with_progress(session, chip, image, &mut NoProgress)
}

/// Program an image into the target
///
/// The sequence is:
/// 1. Check the signature; on mismatch nothing else is sent
/// 2. Erase the chip
/// 3. Program and verify the low, high and extended fuses
/// 4. For every page from the image base to the end of flash: skip it if
///    blank (the erase already left it blank), otherwise write, commit and
///    verify it
/// 5. Program and verify the lock bits
///
/// The first failure aborts the upload. There is no rollback; a failed
/// upload leaves the chip erased or partially written and unlocked.
pub fn upload_image_with_progress<B: IspBus, P: UploadProgress + ?Sized>(
    session: &mut IspSession<B>,
    chip: &ChipDescriptor,
    image: &FirmwareImage<'_>,
    progress: &mut P,
) -> Result<UploadStats> {
    check_geometry(chip)?;
    let mut page = PageBuffer::acquire(chip.page_size)?;
    image.check_fits(chip)?;

    let found = read_signature(session)?;
    if found != chip.signature {
        return Err(Error::SignatureMismatch {
            expected: chip.signature,
            found,
        });
    }

    progress.erasing();
    erase_chip(session)?;

    progress.programming_fuses();
    fuse::program_fuses(session, chip)?;

    let base = image.base_address();
    log::info!(
        "avrisp: writing '{}' from 0x{:04X} to {}",
        image.name(),
        base,
        chip.name
    );
    progress.writing(page_count_from(chip, base));

    let mut stats = UploadStats::default();
    for address in page_addresses(chip, base) {
        image.read_page(address, &mut page)?;
        if page.is_blank() {
            stats.pages_skipped += 1;
            progress.page_done(address, false);
            continue;
        }

        log::debug!("avrisp: page 0x{:04X}", address);
        write_page(session, address, &page)?;
        verify_page(session, address, &page)?;
        stats.pages_written += 1;
        progress.page_done(address, true);
    }

    progress.locking();
    fuse::lock_chip(session, chip)?;

    log::info!(
        "avrisp: {} page(s) written, {} blank",
        stats.pages_written,
        stats.pages_skipped
    );
    progress.complete(&stats);
    Ok(stats)
}

/// Compare the target's flash with an image
///
/// Equivalent to [`verify_image_with_progress`] without progress reporting.
pub fn verify_image<B: IspBus>(
    session: &mut IspSession<B>,
    chip: &ChipDescriptor,
    image: &FirmwareImage<'_>,
) -> Result<u32> {
    verify_image_with_progress(session, chip, image, &mut NoProgress)
}

/// Compare the target's flash with an image
///
/// Every non-blank page of the image is read back. Returns the number of
/// pages compared, or `FlashVerifyError` at the first mismatch. Blank pages
/// are not read.
pub fn verify_image_with_progress<B: IspBus, P: ReadProgress + ?Sized>(
    session: &mut IspSession<B>,
    chip: &ChipDescriptor,
    image: &FirmwareImage<'_>,
    progress: &mut P,
) -> Result<u32> {
    check_geometry(chip)?;
    let mut page = PageBuffer::acquire(chip.page_size)?;
    image.check_fits(chip)?;

    let base = image.base_address();
    progress.reading(page_count_from(chip, base));

    let mut verified = 0;
    for address in page_addresses(chip, base) {
        image.read_page(address, &mut page)?;
        if !page.is_blank() {
            verify_page(session, address, &page)?;
            verified += 1;
        }
        progress.page_read(address);
    }

    log::info!("avrisp: {} page(s) verified", verified);
    Ok(verified)
}
